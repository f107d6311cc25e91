//! The document template: a pure function from form state + station
//! constants to a fixed-layout page model. The model carries only strings;
//! geometry belongs to the consumers (the rasterizer and the HTML fallback),
//! which both read this one value so the two outputs cannot drift apart.

use crate::config::StationConfig;
use crate::fields;
use crate::form::FormState;

pub const PERMIT_TITLE: &str =
    "APPLICATION AND PERMIT TO TRANSFER CONTAINERIZED CARGO TO A CONTAINER STATION";

pub const TABLE_HEADERS: [&str; 6] = [
    "ULD TYPE & NO",
    "NO. OF PCS",
    "CARRIER & FLT NO.",
    "AWB NO.",
    "WEIGHT",
    "CONSIGNOR",
];

/// The table prints exactly four data rows regardless of the form contents.
pub const TABLE_ROWS: usize = 4;

pub const CONDITION_LINE: &str = "IN APPARENT GOOD ORDER AND CONDITION EXCEPT AS NOTED";
pub const RETURN_LABEL: &str = "RETURN TO AIRLINE";

pub const ACK_RECEIVED_BY: &str = "Received By:";
pub const ACK_DATE_TIME: &str = "Date/Time:";
pub const ACK_LOOSE_PCS: &str = "Loose pcs:";
pub const ACK_NO_OF_PALLETS: &str = "No. of Pallets:";
pub const ACK_BREAKDOWN: &str = "Breakdown Complete By:";

pub const SIGNATURE_CAPTIONS: [&str; 4] = [
    "SIGNATURE OF AUTHORIZED AGENT OF CONTAINER STATION",
    "SIGNATURE OF AUTHORIZED AGENT OF CARRIER",
    "SIGNATURE OF CARTMAN",
    "SIGNATURE OF CONTAINER STATION OPERATOR",
];

const BOILERPLATE_LINE_1: &str = "TO: DISTRICT DIRECTOR OF CUSTOMS";
const BOILERPLATE_LINE_2: &str =
    "APPLICATION IS MADE TO TRANSFER THE CONTAINERS AND THEIR CONTENTS LISTED BELOW TO";
const BOILERPLATE_LINE_3_REST: &str =
    " (CONTAINER STATION). AN ABSTRACT OF THE CARRIERS MANIFEST";
const BOILERPLATE_LINE_4: &str = "COVERING THE CONTENTS IS ATTACHED.";

/// One line of the legal boilerplate block. The bold prefix is non-empty
/// only on the line that names the container station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoilerplateLine {
    pub bold: String,
    pub rest: String,
}

/// The composed page: everything the rasterizer and the fallback document
/// need, nothing they could disagree about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    pub station_name: String,
    pub firms_code: String,
    pub address: String,
    pub date: String,
    pub from: String,
    pub trucking: String,
    /// 4 rows x 6 columns; blank cells are empty strings.
    pub rows: [[String; 6]; TABLE_ROWS],
}

impl PageTemplate {
    /// "To: <station> FIRMS CODE:" without the code; the oversized code
    /// itself prints separately.
    pub fn firms_label(&self) -> String {
        format!("To: {} FIRMS CODE:", self.station_name)
    }

    pub fn delivered_bold(&self) -> String {
        format!("DELIVERED TO: {}", self.station_name)
    }

    pub fn boilerplate(&self) -> [BoilerplateLine; 4] {
        let plain = |s: &str| BoilerplateLine { bold: String::new(), rest: s.to_string() };
        [
            plain(BOILERPLATE_LINE_1),
            plain(BOILERPLATE_LINE_2),
            BoilerplateLine {
                bold: self.station_name.clone(),
                rest: BOILERPLATE_LINE_3_REST.to_string(),
            },
            plain(BOILERPLATE_LINE_4),
        ]
    }
}

/// Composes the permit page from the form and station constants.
///
/// The table shape is a fixed policy, not data-driven: row 1 carries the
/// full shipment line, rows 2-3 carry only the extra pallet/carton pairs in
/// their first two columns, row 4 is always blank.
pub fn compose(form: &FormState, station: &StationConfig) -> PageTemplate {
    let cell = |name: &str| form.get(name).to_string();
    let blank = String::new;

    let mut rows: [[String; 6]; TABLE_ROWS] = Default::default();
    rows[0] = [
        cell(&fields::bup_info(1)),
        cell(&fields::cartons_count(1)),
        cell(fields::FLIGHT_NO),
        cell(fields::MAWB),
        cell(fields::WEIGHT),
        cell(fields::CONSIGNOR),
    ];
    for n in 2..=fields::BUP_GROUPS {
        rows[n - 1] = [
            cell(&fields::bup_info(n)),
            cell(&fields::cartons_count(n)),
            blank(),
            blank(),
            blank(),
            blank(),
        ];
    }
    // rows[3] stays blank.

    PageTemplate {
        station_name: station.name.clone(),
        firms_code: station.firms_code.clone(),
        address: station.address.clone(),
        date: cell(fields::DATE),
        from: cell(fields::FROM),
        trucking: cell(fields::TRUCKING),
        rows,
    }
}

//! Print-window fallback: when rasterization or PDF assembly fails, the
//! composed page is written out as a self-contained HTML document and handed
//! to the platform so the user can print it. The document invokes the print
//! dialog itself after a short settle delay so layout has finished by the
//! time the dialog snapshots the page.

use crate::template::{
    PageTemplate, ACK_BREAKDOWN, ACK_DATE_TIME, ACK_LOOSE_PCS, ACK_NO_OF_PALLETS,
    ACK_RECEIVED_BY, CONDITION_LINE, PERMIT_TITLE, RETURN_LABEL, SIGNATURE_CAPTIONS,
    TABLE_HEADERS,
};

/// Delay before the fallback document triggers the print dialog.
pub const PRINT_SETTLE_MS: u32 = 500;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Empty cells keep their height with a non-breaking blank.
fn cell_text(value: &str) -> String {
    if value.is_empty() {
        "&nbsp;".to_string()
    } else {
        escape(value)
    }
}

fn underline_field(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!(
        "<div class=\"field\"><span class=\"label\">{}:</span>\
         <span class=\"line\">{}</span></div>\n",
        escape(label),
        cell_text(value)
    ));
}

/// Renders the composed page into a minimal printable document shell,
/// titled with the identifying number.
pub fn print_shell(page: &PageTemplate, title: &str) -> String {
    let mut out = String::with_capacity(8 * 1024);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(title)));
    out.push_str(
        "<style>\n\
         body { font-family: Arial, sans-serif; font-size: 12px; color: #000; }\n\
         .page { width: 8.5in; height: 11in; padding: 0.4in; box-sizing: border-box; }\n\
         h1 { font-size: 26px; text-align: center; letter-spacing: 0.5px; }\n\
         .field { margin-bottom: 20px; }\n\
         .label { font-weight: bold; display: inline-block; width: 80px; }\n\
         .line { border-bottom: 2px solid #000; display: inline-block; width: 250px;\n\
                 text-align: center; font-size: 16px; }\n\
         .permit-title { font-weight: bold; font-size: 13px; margin-bottom: 20px; }\n\
         .firms { font-size: 13px; font-weight: bold; margin-bottom: 15px; }\n\
         .firms .code { font-size: 36px; margin-left: 8px; }\n\
         .boiler { font-size: 12px; margin-bottom: 15px; }\n\
         table { width: 100%; border-collapse: collapse; border: 3px solid #000;\n\
                 margin-bottom: 15px; }\n\
         th, td { border: 1px solid #000; padding: 6px; text-align: center; }\n\
         th { font-size: 12px; }\n\
         td { font-size: 16px; height: 35px; }\n\
         .footer { font-size: 11px; margin-bottom: 10px; }\n\
         .condition { font-size: 11px; display: flex; justify-content: space-between; }\n\
         .ack { border: 2px solid #000; padding: 12px; font-size: 11px; margin: 25px 0; }\n\
         .ack .slot { border-bottom: 1px solid #000; display: inline-block; width: 200px; }\n\
         .sigpair { display: flex; justify-content: space-between; margin-bottom: 35px; }\n\
         .sig { width: 48%; }\n\
         .sig .rule { border-bottom: 2px solid #000; }\n\
         .sig .caption { font-size: 9px; font-weight: bold; }\n\
         </style>\n</head>\n<body>\n<div class=\"page\">\n",
    );

    out.push_str(&format!("<h1>{}</h1>\n", escape(&page.station_name)));
    underline_field(&mut out, "DATE", &page.date);
    out.push_str(&format!("<div class=\"permit-title\">{}</div>\n", escape(PERMIT_TITLE)));
    underline_field(&mut out, "FROM", &page.from);
    underline_field(&mut out, "TRUCKING", &page.trucking);

    out.push_str(&format!(
        "<div class=\"firms\">{}<span class=\"code\">{}</span></div>\n",
        escape(&page.firms_label()),
        escape(&page.firms_code)
    ));

    out.push_str("<div class=\"boiler\">\n");
    for line in page.boilerplate() {
        if line.bold.is_empty() {
            out.push_str(&format!("{}<br>\n", escape(&line.rest)));
        } else {
            out.push_str(&format!(
                "<strong>{}</strong>{}<br>\n",
                escape(&line.bold),
                escape(&line.rest)
            ));
        }
    }
    out.push_str("</div>\n");

    out.push_str("<table>\n<thead>\n<tr>");
    for header in TABLE_HEADERS {
        out.push_str(&format!("<th>{}</th>", escape(header)));
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &page.rows {
        out.push_str("<tr>");
        for value in row {
            out.push_str(&format!("<td>{}</td>", cell_text(value)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");

    out.push_str(&format!(
        "<div class=\"footer\"><strong>{}</strong> {}</div>\n",
        escape(&page.delivered_bold()),
        escape(&page.address)
    ));
    out.push_str(&format!(
        "<div class=\"condition\"><span>{}</span><span><strong>{}</strong></span></div>\n",
        escape(CONDITION_LINE),
        escape(RETURN_LABEL)
    ));

    out.push_str("<div class=\"ack\">\n");
    out.push_str(&format!(
        "<div><strong>{}</strong> <span class=\"slot\">&nbsp;</span> \
         <strong>{}</strong> <span class=\"slot\">&nbsp;</span></div>\n",
        escape(ACK_RECEIVED_BY),
        escape(ACK_DATE_TIME)
    ));
    out.push_str(&format!(
        "<div><strong>{}</strong> <span class=\"slot\">&nbsp;</span> \
         <strong>{}</strong> <span class=\"slot\">&nbsp;</span></div>\n",
        escape(ACK_LOOSE_PCS),
        escape(ACK_NO_OF_PALLETS)
    ));
    out.push_str(&format!(
        "<div><strong>{}</strong> <span class=\"slot\">&nbsp;</span></div>\n",
        escape(ACK_BREAKDOWN)
    ));
    out.push_str("</div>\n");

    for pair in SIGNATURE_CAPTIONS.chunks(2) {
        out.push_str("<div class=\"sigpair\">\n");
        for caption in pair {
            out.push_str(&format!(
                "<div class=\"sig\"><div class=\"rule\">&nbsp;</div>\
                 <div class=\"caption\">{}</div></div>\n",
                escape(caption)
            ));
        }
        out.push_str("</div>\n");
    }

    out.push_str(&format!(
        "</div>\n<script>setTimeout(function() {{ window.print(); }}, {});</script>\n\
         </body>\n</html>\n",
        PRINT_SETTLE_MS
    ));
    out
}

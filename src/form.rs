//! Form state: a total map from field name to string value. All writes are
//! accepted verbatim (the permit form has no validation beyond empty-string
//! defaults) and every write is immediately visible to the template renderer
//! because both read the same store.

use chrono::Utc;
use chrono_tz::America::Chicago;
use std::collections::HashMap;

use crate::fields;

/// Today's date at the container station, formatted the way the permit
/// prints it.
pub fn today_at_station() -> String {
    Utc::now().with_timezone(&Chicago).format("%m/%d/%Y").to_string()
}

/// A pure description of a form mutation, applied by [`FormState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Field { name: String, value: String },
    Reset,
}

/// Key-value store backing one document variant's form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    values: HashMap<String, String>,
}

impl FormState {
    /// An entirely empty form.
    pub fn new() -> Self {
        FormState::default()
    }

    /// A fresh form with the Date field pre-populated. Only construction
    /// seeds the date; `reset` never re-seeds it.
    pub fn seeded(date: String) -> Self {
        let mut form = FormState::new();
        form.set(fields::DATE, date);
        form
    }

    /// Unset keys read as the empty string.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Total setter: no validation, all inputs accepted verbatim.
    pub fn set(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }

    /// Clears every field, the date included.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Single update function for dispatched events.
    pub fn apply(&mut self, event: FormEvent) {
        match event {
            FormEvent::Field { name, value } => self.set(&name, value),
            FormEvent::Reset => self.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_is_identity() {
        let mut form = FormState::new();
        for spec in fields::REGISTRY.iter() {
            let value = format!("value for {}", spec.name);
            form.set(spec.name, value.clone());
            assert_eq!(form.get(spec.name), value);
        }
        // Non-numeric text in numeric-labeled fields is accepted verbatim.
        form.set("Cartons Count1", "about forty".to_string());
        assert_eq!(form.get("Cartons Count1"), "about forty");
    }

    #[test]
    fn unset_keys_read_as_empty() {
        let form = FormState::new();
        assert_eq!(form.get("MAWB"), "");
        assert_eq!(form.get("no such field"), "");
    }

    #[test]
    fn reset_clears_without_reseeding_the_date() {
        let mut form = FormState::seeded("01/02/2026".to_string());
        assert_eq!(form.get(fields::DATE), "01/02/2026");
        form.set(fields::MAWB, "123-45678901".to_string());
        form.reset();
        assert_eq!(form.get(fields::DATE), "");
        assert_eq!(form.get(fields::MAWB), "");
    }

    #[test]
    fn events_route_through_one_update_function() {
        let mut form = FormState::new();
        form.apply(FormEvent::Field { name: "Weight".into(), value: "1024 KG".into() });
        assert_eq!(form.get("Weight"), "1024 KG");
        form.apply(FormEvent::Reset);
        assert_eq!(form.get("Weight"), "");
    }

    #[test]
    fn station_date_is_us_formatted() {
        let date = today_at_station();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[2..3], "/");
        assert_eq!(&date[5..6], "/");
    }
}

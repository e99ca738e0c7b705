//! Input validation for new stage records.
//!
//! Checks everything that can be decided from the input alone. Upstream
//! reference resolution needs the store and happens there.

use rust_decimal::Decimal;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::types::{NewStageRecord, Role, Stage};

/// Calendar date format accepted on input and used on output.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Malformed input. The record is never created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("weight must be a positive number of kg, got {weight}")]
    NonPositiveWeight { weight: Decimal },

    #[error("'{field}' must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("{stage} records cannot reference an upstream record")]
    UnexpectedUpstream { stage: Stage },

    #[error("role cannot change from {from} to {to}")]
    RoleImmutable { from: Role, to: Role },
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<Date, ValidationError> {
    Date::parse(raw.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        value: raw.to_string(),
    })
}

/// Validate a new record's self-contained fields and return its parsed date.
pub fn validate_new_record(new: &NewStageRecord) -> Result<Date, ValidationError> {
    if new.actor_id.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "actor_id" });
    }
    if new.commodity_name.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "commodity_name",
        });
    }
    if new.location.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "location" });
    }
    if new.weight <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveWeight { weight: new.weight });
    }
    for (field, value) in new.fields.amounts() {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount { field, value });
        }
    }

    let stage = new.stage();
    match (stage.predecessor(), new.upstream_id()) {
        (None, Some(_)) => return Err(ValidationError::UnexpectedUpstream { stage }),
        (Some(_), None) => {
            return Err(ValidationError::MissingField {
                field: "upstream_record_id",
            })
        }
        _ => {}
    }

    parse_date(&new.date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HarvestFields, PurchaseFields, ShipmentStatus, StageFields};
    use time::macros::date;

    fn harvest() -> NewStageRecord {
        NewStageRecord {
            actor_id: "farmer-1".to_string(),
            upstream_record_id: None,
            commodity_name: "Rice".to_string(),
            weight: Decimal::from(500),
            date: "2024-01-15".to_string(),
            location: "Village A, State X".to_string(),
            fields: StageFields::Harvest(HarvestFields {
                expected_price: Decimal::from(25),
            }),
        }
    }

    fn purchase(upstream: Option<&str>) -> NewStageRecord {
        NewStageRecord {
            actor_id: "dist-1".to_string(),
            upstream_record_id: upstream.map(str::to_string),
            commodity_name: "Rice".to_string(),
            weight: Decimal::from(500),
            date: "2024-01-16".to_string(),
            location: "Warehouse Delhi".to_string(),
            fields: StageFields::Purchase(PurchaseFields {
                buying_price: Decimal::from(25),
                other_charges: Decimal::from(500),
                status: ShipmentStatus::InTransit,
            }),
        }
    }

    #[test]
    fn valid_harvest_returns_parsed_date() {
        assert_eq!(validate_new_record(&harvest()), Ok(date!(2024 - 01 - 15)));
    }

    #[test]
    fn zero_and_negative_weight_rejected() {
        for w in [Decimal::ZERO, Decimal::from(-3)] {
            let mut rec = harvest();
            rec.weight = w;
            assert_eq!(
                validate_new_record(&rec),
                Err(ValidationError::NonPositiveWeight { weight: w })
            );
        }
    }

    #[test]
    fn unparseable_dates_rejected() {
        for bad in ["", "15/01/2024", "2024-02-30", "yesterday"] {
            let mut rec = harvest();
            rec.date = bad.to_string();
            assert!(
                matches!(
                    validate_new_record(&rec),
                    Err(ValidationError::InvalidDate { .. })
                ),
                "date {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn blank_commodity_is_missing_field() {
        let mut rec = harvest();
        rec.commodity_name = "   ".to_string();
        assert_eq!(
            validate_new_record(&rec),
            Err(ValidationError::MissingField {
                field: "commodity_name"
            })
        );
    }

    #[test]
    fn negative_charges_rejected() {
        let mut rec = purchase(Some("BC001"));
        rec.fields = StageFields::Purchase(PurchaseFields {
            buying_price: Decimal::from(25),
            other_charges: Decimal::from(-1),
            status: ShipmentStatus::Processing,
        });
        assert_eq!(
            validate_new_record(&rec),
            Err(ValidationError::NegativeAmount {
                field: "other_charges",
                value: Decimal::from(-1),
            })
        );
    }

    #[test]
    fn upstream_presence_follows_stage() {
        assert!(validate_new_record(&purchase(Some("BC001"))).is_ok());
        assert_eq!(
            validate_new_record(&purchase(None)),
            Err(ValidationError::MissingField {
                field: "upstream_record_id"
            })
        );
        assert_eq!(
            validate_new_record(&purchase(Some("  "))),
            Err(ValidationError::MissingField {
                field: "upstream_record_id"
            })
        );

        let mut rec = harvest();
        rec.upstream_record_id = Some("BC000".to_string());
        assert_eq!(
            validate_new_record(&rec),
            Err(ValidationError::UnexpectedUpstream {
                stage: Stage::Harvest
            })
        );
    }
}

//! Source ingestion: raw inputs → typed, scope-tagged rule collections.
//!
//! The driver hands over a fully materialized snapshot ([`RawInputs`]).
//! [`ingest`] decodes every override payload up front, so a single malformed
//! group fails the whole pass before any merging starts.

mod collection;
mod decode;


pub use self::collection::*;
pub use self::decode::{decode_alert_payload, decode_record_payload, ingest};

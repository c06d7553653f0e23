// Territory normalization.
//
// Users, trips, and the logger rollup all carry a service-area label
// that must collapse to the same reporting categories. Keeping one
// normalizer here is what guarantees the three call sites agree.
use crate::zones::{OUT_OF_REGION, UNKNOWN};

/// Label applied when the State/Fed funding source overrides the
/// geocoded service area.
pub const GCO_STATE_FED: &str = "GCO State/Fed";
/// Substring marking any regional-consortium sub-area.
pub const GCO_MARKER: &str = "GCO";
/// Combined bucket for unclassifiable users.
pub const UNKNOWN_OUT_OF_REGION: &str = "Unknown/Out of Region";

/// Service-area label adjusted for funding source: any State/Fed value
/// replaces the geocoded label wholesale.
pub fn funding_adjusted(service_area: &str, funding_flag: bool) -> String {
    if funding_flag {
        GCO_STATE_FED.to_string()
    } else {
        service_area.to_string()
    }
}

/// Collapse a funding-adjusted label to its reporting territory: all
/// GCO sub-areas merge into one bucket, and the two unclassified codes
/// merge into another. Everything else passes through.
pub fn territory(funding_adjusted: &str) -> String {
    if funding_adjusted.contains(GCO_MARKER) {
        GCO_MARKER.to_string()
    } else if funding_adjusted == UNKNOWN || funding_adjusted == OUT_OF_REGION {
        UNKNOWN_OUT_OF_REGION.to_string()
    } else {
        funding_adjusted.to_string()
    }
}

/// Full normalization for one record: `(funding-adjusted, territory)`.
pub fn normalize(service_area: &str, funding_flag: bool) -> (String, String) {
    let adjusted = funding_adjusted(service_area, funding_flag);
    let territory = territory(&adjusted);
    (adjusted, territory)
}

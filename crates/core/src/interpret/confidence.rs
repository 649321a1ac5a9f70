/// Cap when both a price and a quantity were independently resolved.
pub const BOTH_RESOLVED_CAP: f64 = 0.9;
/// Cap when only one of price/quantity resolved.
pub const SINGLE_RESOLVED_CAP: f64 = 0.6;

/// Combine matcher and extractor confidences into the single score stored on
/// the line item.
///
/// The score starts at zero and takes the maximum of whichever component
/// confidences are present, then is capped by how much was actually
/// corroborated: both price and quantity resolved caps at 0.9, exactly one
/// at 0.6, neither at 0. Near-certainty is never claimed unless both price
/// and quantity were independently resolved.
pub fn aggregate_confidence(
    category_confidence: Option<f64>,
    quantity_confidence: Option<f64>,
    price_resolved: bool,
    quantity_resolved: bool,
) -> f64 {
    let mut confidence: f64 = 0.0;
    if let Some(value) = category_confidence {
        confidence = confidence.max(value);
    }
    if let Some(value) = quantity_confidence {
        confidence = confidence.max(value);
    }

    let cap = match (price_resolved, quantity_resolved) {
        (true, true) => BOTH_RESOLVED_CAP,
        (true, false) | (false, true) => SINGLE_RESOLVED_CAP,
        (false, false) => 0.0,
    };
    confidence.min(cap)
}

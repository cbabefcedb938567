//! Merging of user text and image analysis into one outbound turn.

/// Build the text of the outbound turn.
///
/// Empty strings count as absent. The gateway rejects requests where both
/// are absent before calling this, in which case an empty string results.
pub fn compose(user_text: Option<&str>, analysis: Option<&str>) -> String {
    let user_text = user_text.filter(|t| !t.is_empty());
    let analysis = analysis.filter(|a| !a.is_empty());

    match (user_text, analysis) {
        (Some(text), Some(analysis)) => format!("{}\n\nImage Analysis: {}", text, analysis),
        (None, Some(analysis)) => format!("Please analyze this image: {}", analysis),
        (Some(text), None) => text.to_string(),
        (None, None) => String::new(),
    }
}

//! Header comments carried over from the source data file

/// Turn Touchstone comment text into `*` SPICE comment lines
///
/// `comments` holds the text after each `!`, as collected by the Touchstone
/// reader; it is kept as is.
///
/// # Example
/// ```
/// use s2spice_core::spice::spice_comments;
/// let text = vec![" Created by VNA".to_string(), "cal: SOLT".to_string()];
/// assert_eq!(spice_comments(&text), vec!["*  Created by VNA", "* cal: SOLT"]);
/// ```
pub fn spice_comments(comments: &[String]) -> Vec<String> {
    comments.iter().map(|text| format!("* {}", text)).collect()
}

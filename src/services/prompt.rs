use crate::models::RatedMovie;

/// Opening sentence of every preference summary
pub const INTRODUCTION: &str = "The movies this user rated highly are as follows.";

/// Renders a user's top-rated movies as the preference text sent to the recommender
///
/// One `title: rating` line per movie follows the introduction, in the order
/// given. An empty history renders the introduction alone.
pub fn render_preferences(history: &[RatedMovie]) -> String {
    history.iter().fold(INTRODUCTION.to_string(), |mut text, rated| {
        // Debug formatting keeps the decimal point on whole ratings ("5.0").
        text.push_str(&format!("\n{}: {:?}", rated.title, rated.rating));
        text
    })
}

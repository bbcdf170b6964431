use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Question text, explanations and exam/course descriptions are stored
/// for later display in the frontend; this strips dangerous tags
/// (like <script>, <iframe>) and attributes (like onclick) while
/// keeping safe formatting tags.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

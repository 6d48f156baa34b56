use ammonia;

/// Clean quiz text using the ammonia library.
///
/// Quiz topics, descriptions and question bodies are authored by admins but
/// rendered to students, so they are sanitized on write with a
/// whitelist-based strategy: safe tags (like <b>, <p>) are preserved while
/// dangerous tags (like <script>, <iframe>) and malicious attributes (like
/// onclick) are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

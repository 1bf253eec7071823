//! Joining configured base URLs with endpoint and blob paths.

/// Strip trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use seqopt::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:3000/api"), "http://localhost:3000/api");
/// assert_eq!(normalize_base_url("http://localhost:3000/api//"), "http://localhost:3000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Append `endpoint` to `base_url` with exactly one slash between them.
///
/// Used for API endpoints (`tasks`, `messages/{id}`) as well as blob paths
/// (`{project_id}/input.csv`).
///
/// # Examples
///
/// ```
/// use seqopt::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:3000/api/", "/tasks"),
///     "http://localhost:3000/api/tasks"
/// );
/// assert_eq!(
///     construct_api_url("https://blob.example", "p1/config.json"),
///     "https://blob.example/p1/config.json"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

use woothee::parser::Parser;

/// Browser family for a `User-Agent` header, `None` when it cannot be identified.
pub fn browser_name(user_agent: &str) -> Option<String> {
    if user_agent.trim().is_empty() {
        return None;
    }

    let parsed = Parser::new().parse(user_agent)?;
    match parsed.name {
        "" | "UNKNOWN" => None,
        name => Some(name.to_string()),
    }
}

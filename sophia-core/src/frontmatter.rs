use serde::Deserialize;

/// Document settings from a leading `---` YAML block.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub sidebar_label: Option<String>,
}

/// Splits `content` into the front matter text and the markdown body.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let content = content.trim_start();
    let after_open = content.strip_prefix("---")?;
    let close = after_open.find("\n---")?;

    let front_matter = after_open[..close].trim();
    let rest = &after_open[close + "\n---".len()..];
    let body = rest.strip_prefix(['\r', '\n']).unwrap_or(rest);

    Some((front_matter, body.trim_start_matches(['\r', '\n'])))
}

/// Parses the front matter of `content`, returning it with the remaining body.
pub fn parse_front_matter(content: &str) -> Result<(FrontMatter, &str), serde_yaml::Error> {
    let Some((raw, body)) = split_front_matter(content) else {
        return Ok((FrontMatter::default(), content));
    };

    if raw.is_empty() {
        return Ok((FrontMatter::default(), body));
    }

    Ok((serde_yaml::from_str(raw)?, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_known_keys() {
        let (fm, body) = parse_front_matter(
            "---\ntitle: Hybrid Search\nsidebar_label: Hybrid\ndescription: RRF fusion\n---\n\n# Hybrid\n",
        )
        .unwrap();

        assert_eq!(fm.title.as_deref(), Some("Hybrid Search"));
        assert_eq!(fm.sidebar_label.as_deref(), Some("Hybrid"));
        assert_eq!(fm.description.as_deref(), Some("RRF fusion"));
        assert_eq!(body, "# Hybrid\n");
    }

    #[test]
    fn no_front_matter_returns_whole_body() {
        let (fm, body) = parse_front_matter("# Intro\n\nHello").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "# Intro\n\nHello");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (fm, _) = parse_front_matter("---\nslug: /intro\nsidebar_position: 1\n---\nbody").unwrap();
        assert_eq!(fm, FrontMatter::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(parse_front_matter("---\ntitle: [unclosed\n---\nbody").is_err());
    }
}

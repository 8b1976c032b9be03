use std::fmt;

/// A container image reference split into its registry, repository and tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub registry: Option<String>,
    pub name: String,
    pub tag: Option<String>,
}

impl ImageRef {
    /// Builds a reference from user input, tolerating a registry host or a
    /// `:tag` suffix pasted into the image name.
    pub fn new(registry: Option<&str>, image_name: &str, tag: Option<&str>) -> Self {
        let (name, tag) = parse_image_parts(image_name, tag);
        Self {
            registry: non_empty(registry).map(String::from),
            name,
            tag,
        }
    }

    pub fn uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag.as_deref().unwrap_or_default();
        match &self.registry {
            Some(registry) => write!(f, "{}/{}:{}", registry, self.name, tag),
            None => write!(f, "{}:{}", self.name, tag),
        }
    }
}

/// Normalizes an image name and tag.
///
/// A leading path segment containing a `.` is treated as a registry host and
/// dropped. A `:tag` suffix is split off the name and only used when no
/// explicit tag was given.
pub fn parse_image_parts(image_name: &str, tag: Option<&str>) -> (String, Option<String>) {
    let mut name = image_name;
    if let Some((host, rest)) = name.split_once('/') {
        if host.contains('.') {
            name = rest;
        }
    }

    let tag = non_empty(tag);
    match name.split_once(':') {
        Some((bare, embedded)) => (
            bare.to_string(),
            Some(tag.unwrap_or(embedded).to_string()),
        ),
        None => (name.to_string(), tag.map(String::from)),
    }
}

/// Prefixes `image_name` with the registry when one is configured.
pub fn qualify(registry: Option<&str>, image_name: &str) -> String {
    match non_empty(registry) {
        Some(registry) => format!("{}/{}", registry, image_name),
        None => image_name.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{parse_image_parts, qualify, ImageRef};

    #[test]
    fn strips_registry_from_image_name() {
        let (name, tag) = parse_image_parts("myregistry.com/app", None);
        assert_eq!("app", name);
        assert_eq!(None, tag);
    }

    #[test]
    fn keeps_namespaced_image_name() {
        let (name, tag) = parse_image_parts("team/app", Some("v1"));
        assert_eq!("team/app", name);
        assert_eq!(Some(String::from("v1")), tag);
    }

    #[test]
    fn splits_embedded_tag() {
        let (name, tag) = parse_image_parts("app:v2", None);
        assert_eq!("app", name);
        assert_eq!(Some(String::from("v2")), tag);
    }

    #[test]
    fn explicit_tag_overrides_embedded_tag() {
        let (name, tag) = parse_image_parts("registry.example.com/app:v2", Some("v3"));
        assert_eq!("app", name);
        assert_eq!(Some(String::from("v3")), tag);
    }

    #[test]
    fn empty_tag_counts_as_missing() {
        let (_, tag) = parse_image_parts("app:v2", Some(""));
        assert_eq!(Some(String::from("v2")), tag);
    }

    #[test]
    fn builds_uri_with_and_without_registry() {
        let with_registry = ImageRef::new(
            Some("123.dkr.ecr.eu-west-1.amazonaws.com"),
            "123.dkr.ecr.eu-west-1.amazonaws.com/api:abc",
            None,
        );
        assert_eq!(
            "123.dkr.ecr.eu-west-1.amazonaws.com/api:abc",
            with_registry.uri()
        );

        let without_registry = ImageRef::new(Some(""), "api", Some("latest"));
        assert_eq!("api:latest", without_registry.uri());
    }

    #[test]
    fn qualifies_sidecar_images() {
        assert_eq!("registry.io/fluent-bit", qualify(Some("registry.io"), "fluent-bit"));
        assert_eq!("fluent-bit", qualify(None, "fluent-bit"));
    }
}

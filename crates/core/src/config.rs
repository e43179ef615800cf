use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the configuration file at the site root
pub const CONFIG_FILE: &str = "quire.toml";

/// Raw TOML configuration structure
/// This matches the quire.toml file structure exactly
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    site: RawSite,
    #[serde(default)]
    build: RawBuild,
    #[serde(default)]
    serve: ServeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSite {
    title: String,
    author: String,
    base_url: String,
    description: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    #[serde(default = "default_content_dir")]
    content_dir: String, // Convert to PathBuf
    #[serde(default = "default_static_dir")]
    static_dir: String,
    #[serde(default = "default_output_dir")]
    output_dir: String,
    #[serde(default)]
    drafts: bool,
}

impl Default for RawBuild {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            static_dir: default_static_dir(),
            output_dir: default_output_dir(),
            drafts: false,
        }
    }
}

fn default_content_dir() -> String {
    "content".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_output_dir() -> String {
    "public".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Complete site configuration
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub site: SiteMeta,
    pub build: BuildConfig,
    pub serve: ServeConfig,
}

/// Site-wide metadata shown on every page
#[derive(Debug, Clone)]
pub struct SiteMeta {
    pub title: String,
    /// Default author for pages that don't name one
    pub author: String,
    pub base_url: String,
    pub description: Option<String>,
    pub language: String,
}

impl SiteMeta {
    /// Absolute URL for a site-relative path
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Source and output locations, relative to the site root
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub output_dir: PathBuf,
    pub drafts: bool,
}

/// Preview server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Parse quire.toml from a file path
pub fn parse_site_toml<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let content = fs::read_to_string(path)?;
    parse_site_toml_str(&content)
}

/// Parse quire.toml from a string (useful for testing)
pub fn parse_site_toml_str(content: &str) -> Result<SiteConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.site.title.trim().is_empty() {
        return Err(Error::ConfigParse("site.title must not be empty".to_string()));
    }
    if raw.site.author.trim().is_empty() {
        return Err(Error::ConfigParse(
            "site.author must not be empty".to_string(),
        ));
    }

    let site = SiteMeta {
        title: raw.site.title,
        author: raw.site.author,
        base_url: raw.site.base_url,
        description: raw.site.description,
        language: raw.site.language.unwrap_or_else(|| "en".to_string()),
    };

    let build = BuildConfig {
        content_dir: validate_path(&raw.build.content_dir, "build.content_dir")?,
        static_dir: validate_path(&raw.build.static_dir, "build.static_dir")?,
        output_dir: validate_path(&raw.build.output_dir, "build.output_dir")?,
        drafts: raw.build.drafts,
    };
    check_output_dir(&build)?;

    Ok(SiteConfig {
        site,
        build,
        serve: raw.serve,
    })
}

/// Validate and convert a path string to PathBuf.
///
/// This function prevents path traversal by rejecting:
/// - Absolute paths (starting with `/` or Windows drive letters)
/// - Paths containing parent directory references (`..`)
///
/// # Examples
///
/// ```text
/// validate_path("content", "build.content_dir")     → Ok(PathBuf)
/// validate_path("/etc", "build.static_dir")         → Err("Absolute paths not allowed...")
/// validate_path("../public", "build.output_dir")    → Err("Parent directory references...")
/// ```
fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    let path = Path::new(path_str);

    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    Ok(path.to_path_buf())
}

/// Path with `.` components dropped, so `./public` and `public` compare equal
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// The output directory is replaced on every build, so it must not be the
/// site root or share a tree with the content or static directory.
fn check_output_dir(build: &BuildConfig) -> Result<()> {
    let output = normalized(&build.output_dir);
    if output.as_os_str().is_empty() {
        return Err(Error::ConfigParse(
            "'build.output_dir' must not be the site root".to_string(),
        ));
    }

    for (field, dir) in [
        ("build.content_dir", &build.content_dir),
        ("build.static_dir", &build.static_dir),
    ] {
        let dir = normalized(dir);
        if output.starts_with(&dir) || dir.starts_with(&output) {
            return Err(Error::ConfigParse(format!(
                "'build.output_dir' ({}) overlaps '{}' ({})",
                build.output_dir.display(),
                field,
                dir.display()
            )));
        }
    }
    Ok(())
}

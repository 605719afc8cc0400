use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CloudstrapError;

const DEFAULT_CONFIG_DIR: &str = "~/.cloudstrap";

/// The directory holding one `<provider>.properties` file per provider.
///
/// The mapping from provider name to file is fixed at startup by whoever
/// constructs the `ConfigDir`; provider names never become arbitrary paths.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ConfigDir { root: root.into() }
    }

    /// The installation default, `~/.cloudstrap`.
    pub fn default_location() -> Self {
        ConfigDir {
            root: expand_tilde(DEFAULT_CONFIG_DIR),
        }
    }

    fn resource_path(&self, provider: &str) -> PathBuf {
        self.root.join(format!("{provider}.properties"))
    }
}

/// Credentials and connection overrides for one provider, resolved from its
/// properties file. Immutable once loaded.
///
/// `identity` is always the literal configured string. `credential` is
/// always a file reference: the configured value names a file whose UTF-8
/// contents become the credential, and an unreadable file fails the load.
/// Override values prefixed with `file:` are forced file references with the
/// same fatal-on-unreadable rule. Bare override values use an existence
/// probe for backward compatibility: a value naming a readable file is
/// replaced by that file's contents, anything else is kept verbatim. The
/// probe can misfire when a literal value happens to match a real path, so
/// new configurations should prefer the explicit `file:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    provider: String,
    identity: String,
    credential: String,
    overrides: HashMap<String, String>,
}

impl ProviderCredentials {
    /// Loads and resolves the configuration for `provider` from `dir`.
    ///
    /// Requires the keys `<provider>.identity` and `<provider>.credential`;
    /// every other key/value pair in the file becomes an override, keyed by
    /// its original (prefixed) name.
    pub fn load(provider: &str, dir: &ConfigDir) -> Result<Self, CloudstrapError> {
        let path = dir.resource_path(provider);
        let contents =
            fs::read_to_string(&path).map_err(|_| CloudstrapError::ConfigResourceMissing {
                provider: provider.to_string(),
                path: path.clone(),
            })?;

        let mut pairs = parse_properties(&contents);

        let identity = take_required(&mut pairs, provider, &format!("{provider}.identity"))?;
        let credential_key = format!("{provider}.credential");
        let credential_path = take_required(&mut pairs, provider, &credential_key)?;
        let credential = file_contents(&credential_key, Path::new(&credential_path))?;

        let mut overrides = HashMap::new();
        for (key, value) in pairs {
            let resolved = resolve_override(&key, &value)?;
            overrides.insert(key, resolved);
        }

        Ok(ProviderCredentials {
            provider: provider.to_string(),
            identity,
            credential,
            overrides,
        })
    }

    /// Builds a record directly, bypassing file resolution. Intended for
    /// callers that obtain credentials some other way, and for tests.
    pub fn new(
        provider: impl Into<String>,
        identity: impl Into<String>,
        credential: impl Into<String>,
        overrides: HashMap<String, String>,
    ) -> Self {
        ProviderCredentials {
            provider: provider.into(),
            identity: identity.into(),
            credential: credential.into(),
            overrides,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn overrides(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    pub fn override_value(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    /// Looks up an override that the caller cannot proceed without.
    pub fn require_override(&self, key: &str) -> Result<&str, CloudstrapError> {
        self.override_value(key)
            .ok_or_else(|| CloudstrapError::ConfigKeyMissing {
                provider: self.provider.clone(),
                key: key.to_string(),
            })
    }
}

/// Parses standard properties-file syntax into ordered key/value pairs:
/// `#`/`!` comment lines, `=` or `:` separators, trimmed keys and values,
/// and trailing-backslash line continuation.
fn parse_properties(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        // A trailing backslash splices the next line onto this one.
        let mut logical = trimmed.to_string();
        while logical.ends_with('\\') {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_pair(&logical);
        if !key.is_empty() {
            pairs.push((key, value));
        }
    }

    pairs
}

fn split_pair(line: &str) -> (String, String) {
    match line.find(['=', ':']) {
        Some(idx) => (
            line[..idx].trim().to_string(),
            line[idx + 1..].trim().to_string(),
        ),
        // A line with no separator is a key with an empty value.
        None => (line.trim().to_string(), String::new()),
    }
}

/// Removes `key` from the parsed pairs, failing if it is absent or empty.
/// A required key bound to an empty value would otherwise produce a record
/// that violates the non-empty identity/credential invariant.
fn take_required(
    pairs: &mut Vec<(String, String)>,
    provider: &str,
    key: &str,
) -> Result<String, CloudstrapError> {
    fn missing(provider: &str, key: &str) -> CloudstrapError {
        CloudstrapError::ConfigKeyMissing {
            provider: provider.to_string(),
            key: key.to_string(),
        }
    }

    let idx = pairs
        .iter()
        .position(|(k, _)| k == key)
        .ok_or_else(|| missing(provider, key))?;
    let (_, value) = pairs.remove(idx);
    if value.is_empty() {
        return Err(missing(provider, key));
    }
    Ok(value)
}

fn resolve_override(key: &str, value: &str) -> Result<String, CloudstrapError> {
    if let Some(path) = value.strip_prefix("file:") {
        return file_contents(key, Path::new(path));
    }
    // Existence probe: a readable file at the value's path wins over the
    // literal. See the hazard note on ProviderCredentials.
    match fs::read_to_string(Path::new(value)) {
        Ok(contents) => Ok(contents),
        Err(_) => Ok(value.to_string()),
    }
}

fn file_contents(key: &str, path: &Path) -> Result<String, CloudstrapError> {
    fs::read_to_string(path).map_err(|source| CloudstrapError::ConfigFileUnreadable {
        key: key.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                dir: TempDir::new().unwrap(),
            }
        }

        fn config_dir(&self) -> ConfigDir {
            ConfigDir::new(self.dir.path())
        }

        fn write(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, contents).unwrap();
            path
        }
    }

    #[test]
    fn loads_identity_and_file_backed_credential() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "XYZ123");
        fx.write(
            "foo.properties",
            &format!(
                "foo.identity=abc\nfoo.credential={}\nfoo.endpoint=https://example.com\n",
                cred.display()
            ),
        );

        let config = ProviderCredentials::load("foo", &fx.config_dir()).unwrap();
        assert_eq!(config.identity(), "abc");
        assert_eq!(config.credential(), "XYZ123");
        assert_eq!(
            config.override_value("foo.endpoint"),
            Some("https://example.com")
        );
        // Only the two required keys are removed; override keys keep their
        // prefixed names.
        assert_eq!(config.overrides().len(), 1);
    }

    #[test]
    fn override_naming_a_readable_file_is_replaced_by_its_contents() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        let blob = fx.write("service-account.json", "{\"project\": \"demo\"}");
        fx.write(
            "gce.properties",
            &format!(
                "gce.identity=svc@demo\ngce.credential={}\ngce.json-credentials={}\n",
                cred.display(),
                blob.display()
            ),
        );

        let config = ProviderCredentials::load("gce", &fx.config_dir()).unwrap();
        assert_eq!(
            config.override_value("gce.json-credentials"),
            Some("{\"project\": \"demo\"}")
        );
    }

    #[test]
    fn override_not_naming_a_file_stays_literal() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        fx.write(
            "foo.properties",
            &format!(
                "foo.identity=abc\nfoo.credential={}\nfoo.zone=us-east1-b\n",
                cred.display()
            ),
        );

        let config = ProviderCredentials::load("foo", &fx.config_dir()).unwrap();
        assert_eq!(config.override_value("foo.zone"), Some("us-east1-b"));
    }

    #[test]
    fn explicit_file_prefix_forces_indirection() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        let pem = fx.write("key.pem", "-----BEGIN KEY-----");
        fx.write(
            "foo.properties",
            &format!(
                "foo.identity=abc\nfoo.credential={}\nfoo.ssh-key=file:{}\n",
                cred.display(),
                pem.display()
            ),
        );

        let config = ProviderCredentials::load("foo", &fx.config_dir()).unwrap();
        assert_eq!(config.override_value("foo.ssh-key"), Some("-----BEGIN KEY-----"));
    }

    #[test]
    fn explicit_file_prefix_fails_when_unreadable() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        fx.write(
            "foo.properties",
            &format!(
                "foo.identity=abc\nfoo.credential={}\nfoo.ssh-key=file:/nonexistent/key.pem\n",
                cred.display()
            ),
        );

        let err = ProviderCredentials::load("foo", &fx.config_dir()).unwrap_err();
        assert!(matches!(
            err,
            CloudstrapError::ConfigFileUnreadable { ref key, .. } if key == "foo.ssh-key"
        ));
    }

    #[test]
    fn missing_resource_is_its_own_error_kind() {
        let fx = Fixture::new();
        let err = ProviderCredentials::load("nope", &fx.config_dir()).unwrap_err();
        assert!(matches!(
            err,
            CloudstrapError::ConfigResourceMissing { ref provider, .. } if provider == "nope"
        ));
    }

    #[test]
    fn missing_identity_key_fails() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        fx.write(
            "foo.properties",
            &format!("foo.credential={}\n", cred.display()),
        );

        let err = ProviderCredentials::load("foo", &fx.config_dir()).unwrap_err();
        assert!(matches!(
            err,
            CloudstrapError::ConfigKeyMissing { ref key, .. } if key == "foo.identity"
        ));
    }

    #[test]
    fn missing_credential_key_fails() {
        let fx = Fixture::new();
        fx.write("foo.properties", "foo.identity=abc\n");

        let err = ProviderCredentials::load("foo", &fx.config_dir()).unwrap_err();
        assert!(matches!(
            err,
            CloudstrapError::ConfigKeyMissing { ref key, .. } if key == "foo.credential"
        ));
    }

    #[test]
    fn empty_required_value_counts_as_missing() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        fx.write(
            "foo.properties",
            &format!("foo.identity=\nfoo.credential={}\n", cred.display()),
        );

        let err = ProviderCredentials::load("foo", &fx.config_dir()).unwrap_err();
        assert!(matches!(err, CloudstrapError::ConfigKeyMissing { .. }));
    }

    #[test]
    fn unreadable_credential_file_fails_with_no_literal_fallback() {
        let fx = Fixture::new();
        fx.write(
            "foo.properties",
            "foo.identity=abc\nfoo.credential=/nonexistent/cred.txt\n",
        );

        let err = ProviderCredentials::load("foo", &fx.config_dir()).unwrap_err();
        assert!(matches!(
            err,
            CloudstrapError::ConfigFileUnreadable { ref key, .. } if key == "foo.credential"
        ));
    }

    #[test]
    fn loading_twice_yields_identical_records() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        fx.write(
            "foo.properties",
            &format!(
                "foo.identity=abc\nfoo.credential={}\nfoo.endpoint=https://example.com\n",
                cred.display()
            ),
        );

        let dir = fx.config_dir();
        let first = ProviderCredentials::load("foo", &dir).unwrap();
        let second = ProviderCredentials::load("foo", &dir).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn require_override_reports_missing_key() {
        let fx = Fixture::new();
        let cred = fx.write("cred.txt", "secret");
        fx.write(
            "foo.properties",
            &format!("foo.identity=abc\nfoo.credential={}\n", cred.display()),
        );

        let config = ProviderCredentials::load("foo", &fx.config_dir()).unwrap();
        let err = config.require_override("foo.endpoint").unwrap_err();
        assert!(matches!(
            err,
            CloudstrapError::ConfigKeyMissing { ref key, .. } if key == "foo.endpoint"
        ));
    }

    #[test]
    fn parses_comments_separators_and_whitespace() {
        let parsed = parse_properties(
            "# comment\n! also a comment\n  a = 1 \nb:2\nc\n\nd=x:y\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), String::new()),
                ("d".to_string(), "x:y".to_string()),
            ]
        );
    }

    #[test]
    fn parses_line_continuations() {
        let parsed = parse_properties("run.list=role[a],\\\n    role[b],\\\n    recipe[c]\n");
        assert_eq!(
            parsed,
            vec![("run.list".to_string(), "role[a],role[b],recipe[c]".to_string())]
        );
    }
}

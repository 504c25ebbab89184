use multiarch_core::ImageConfig;

/// Name of the dependency manifest inside the build context.
pub const CONTEXT_REQUIREMENTS: &str = "requirements.txt";

/// Generates the image definition for a Python payload.
///
/// The full variant installs dependencies in their own layer before the
/// scripts are copied, so editing a script does not invalidate the pip layer.
pub struct DockerfileGenerator<'a> {
    config: &'a ImageConfig,
    staged: Vec<String>,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(config: &'a ImageConfig) -> multiarch_core::Result<Self> {
        config.validate()?;
        let staged = config.staged_files()?;
        Ok(Self { config, staged })
    }

    /// Files the rendered Dockerfile copies from the context.
    pub fn staged_files(&self) -> &[String] {
        &self.staged
    }

    pub fn render(&self) -> String {
        let env: String = self
            .config
            .env
            .iter()
            .map(|(key, value)| format!("ENV {key}={}\n", quote_env_value(value)))
            .collect();

        let dependencies = if self.config.installs_dependencies() {
            format!(
                "\n# === Dependencies ===\n\
                 COPY {req} ./\n\
                 RUN pip install --no-cache-dir -r {req}\n",
                req = CONTEXT_REQUIREMENTS,
            )
        } else {
            String::new()
        };

        format!(
            r#"# syntax=docker/dockerfile:1
FROM {base}
{env}WORKDIR {workdir}
{dependencies}
# === Application ===
{copies}CMD ["{interpreter}", "{entrypoint}"]
"#,
            base = self.config.base_image,
            workdir = self.config.workdir,
            copies = self.render_copies(),
            interpreter = self.config.interpreter,
            entrypoint = self.config.entrypoint,
        )
    }

    /// Top-level files share one `COPY`; nested files keep their relative path.
    fn render_copies(&self) -> String {
        let (flat, nested): (Vec<&String>, Vec<&String>) =
            self.staged.iter().partition(|f| !f.contains('/'));

        let mut out = String::new();
        if !flat.is_empty() {
            let names: Vec<&str> = flat.iter().map(|f| f.as_str()).collect();
            out.push_str(&format!("COPY {} ./\n", names.join(" ")));
        }
        for file in nested {
            out.push_str(&format!("COPY {file} ./{file}\n"));
        }
        out
    }
}

fn quote_env_value(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | ','))
    {
        value.to_owned()
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{escaped}\"")
    }
}

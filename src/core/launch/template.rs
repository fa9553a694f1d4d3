// ─── Version Templates ───
// Filenames and URLs in the setup config carry version tokens that are
// filled in once the runtime and loader versions are known.

pub const MC_VERSION_TOKEN: &str = "{{@mcversion@}}";
pub const LOADER_VERSION_TOKEN: &str = "{{@loaderversion@}}";

/// Runtime + loader version pair used for substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Versions<'a> {
    pub mc_version: &'a str,
    pub loader_version: &'a str,
}

/// Replace every version token in `template`. Unknown tokens are left as-is.
pub fn substitute(template: &str, versions: Versions<'_>) -> String {
    template
        .replace(MC_VERSION_TOKEN, versions.mc_version)
        .replace(LOADER_VERSION_TOKEN, versions.loader_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSIONS: Versions<'static> = Versions {
        mc_version: "1.16.5",
        loader_version: "36.2.0",
    };

    #[test]
    fn replaces_every_occurrence() {
        let url = "https://maven.example.com/forge/{{@mcversion@}}-{{@loaderversion@}}/forge-{{@mcversion@}}-{{@loaderversion@}}-installer.jar";
        assert_eq!(
            substitute(url, VERSIONS),
            "https://maven.example.com/forge/1.16.5-36.2.0/forge-1.16.5-36.2.0-installer.jar"
        );
    }

    #[test]
    fn leaves_plain_strings_alone() {
        assert_eq!(substitute("server.jar", VERSIONS), "server.jar");
        assert_eq!(substitute("{{@other@}}.jar", VERSIONS), "{{@other@}}.jar");
    }
}

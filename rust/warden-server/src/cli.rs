use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Url;
use warden_capability::ScopeRule;
use warden_credentials::{KeyError, KeyMaterial};
use warden_gate::GatedEndpoints;

#[derive(Debug, Parser)]
#[command(name = "warden")]
#[command(bin_name = "warden")]
#[command(about = "Bearer token authentication and request gating", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct WardenCli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: Config,
}

impl WardenCli {
    /// The requested command, `serve` when none was named.
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gate as an HTTP server (default).
    Serve(Config),
    /// Mint a signed token.
    Issue(IssueArgs),
    /// Verify a token and print its claims.
    Verify(VerifyArgs),
}

/// Middleware applied around the gated routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MiddlewareStack {
    /// Reports panic messages to the caller.
    Dev,
    /// Hides panic details and compresses responses.
    #[default]
    Prod,
}

/// Location of the signing key and the previous keys still accepted.
#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    /// PEM encoded RSA private key used to sign tokens.
    #[arg(
        long = "private-key",
        env = "WARDEN_PRIVATE_KEY",
        default_value = "/etc/warden/rsa/private.pem"
    )]
    pub private_key: PathBuf,

    /// Previous private keys, still accepted when verifying tokens.
    #[arg(
        long = "fallback-key",
        env = "WARDEN_FALLBACK_KEYS",
        value_delimiter = ','
    )]
    pub fallback_keys: Vec<PathBuf>,
}

impl KeyArgs {
    /// Read every configured key.
    ///
    /// # Errors
    ///
    /// Fails if any key is unreadable or not an RSA private key.
    pub fn load(&self) -> Result<KeyMaterial, KeyError> {
        let fallbacks: Vec<_> = self.fallback_keys.iter().map(PathBuf::as_path).collect();
        KeyMaterial::load(self.private_key.as_path(), &fallbacks)
    }
}

/// Server configuration, read from flags or `WARDEN_*` variables.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "WARDEN_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    #[command(flatten)]
    pub keys: KeyArgs,

    /// Middleware stack.
    #[arg(long, env = "WARDEN_STACK", value_enum, default_value_t = MiddlewareStack::Prod)]
    pub stack: MiddlewareStack,

    /// Milliseconds the gate waits for an authorization decision.
    #[arg(
        long = "authorization-timeout-ms",
        env = "WARDEN_AUTHORIZATION_TIMEOUT_MS",
        default_value_t = 10_000
    )]
    pub authorization_timeout_ms: u64,

    /// Policy decision endpoint. Decisions are made from token scopes when
    /// unset.
    #[arg(long, env = "WARDEN_AUTHORIZER_URL")]
    pub authorizer_url: Option<Url>,

    /// Milliseconds allowed for one request to the policy decision endpoint.
    #[arg(
        long = "authorizer-timeout-ms",
        env = "WARDEN_AUTHORIZER_TIMEOUT_MS",
        default_value_t = 5_000
    )]
    pub authorizer_timeout_ms: u64,

    /// Scope rules, `SCOPE[@RESOURCE[#ACTION]]`.
    #[arg(long = "scope-rule", env = "WARDEN_SCOPE_RULES", value_delimiter = ',')]
    pub scope_rules: Vec<ScopeRule>,

    /// Paths that require authorization, replacing the verification
    /// endpoints.
    #[arg(long = "gated-path", env = "WARDEN_GATED_PATHS", value_delimiter = ',')]
    pub gated_paths: Vec<String>,
}

impl Config {
    /// Upper bound on a single authorization decision.
    #[must_use]
    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.authorization_timeout_ms)
    }

    /// Client timeout for the remote policy service.
    #[must_use]
    pub fn authorizer_timeout(&self) -> Duration {
        Duration::from_millis(self.authorizer_timeout_ms)
    }

    /// The configured gated paths, or the verification endpoints if none
    /// were given.
    #[must_use]
    pub fn gated_endpoints(&self) -> GatedEndpoints {
        if self.gated_paths.is_empty() {
            GatedEndpoints::default()
        } else {
            GatedEndpoints::new(&self.gated_paths)
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct IssueArgs {
    #[command(flatten)]
    pub keys: KeyArgs,

    /// Token subject.
    #[arg(long)]
    pub subject: String,

    #[arg(long, default_value = "Warden")]
    pub issuer: String,

    /// Space separated scopes.
    #[arg(long, default_value = warden_capability::SCOPE_ALL)]
    pub scope: String,

    #[arg(long)]
    pub tenant: Option<String>,

    #[arg(long)]
    pub audience: Option<String>,

    /// Token identifier.
    #[arg(long)]
    pub id: Option<String>,

    /// Mark the subject as a user rather than a device.
    #[arg(long)]
    pub user: bool,

    /// Seconds until the token expires.
    #[arg(long, default_value_t = 3600, allow_negative_numbers = true)]
    pub expires_in: i64,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub keys: KeyArgs,

    /// Compact token to verify.
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        let args = std::iter::once("warden").chain(args.iter().copied());
        WardenCli::try_parse_from(args).map(WardenCli::into_command)
    }

    #[test]
    fn it_serves_by_default() {
        let Ok(Command::Serve(config)) = parse(&[]) else {
            panic!("expected the serve command");
        };

        assert_eq!(config.stack, MiddlewareStack::Prod);
        assert_eq!(config.authorization_timeout(), Duration::from_secs(10));
        assert_eq!(config.gated_endpoints(), GatedEndpoints::default());
        assert!(config.authorizer_url.is_none());
    }

    #[test]
    fn it_reads_serve_flags() {
        let Ok(Command::Serve(config)) = parse(&[
            "serve",
            "--listen",
            "0.0.0.0:9000",
            "--stack",
            "dev",
            "--private-key",
            "/keys/current.pem",
            "--fallback-key",
            "/keys/previous.pem,/keys/oldest.pem",
            "--scope-rule",
            "mender.users@management#GET",
            "--authorizer-url",
            "http://policy.local/decide",
        ]) else {
            panic!("expected the serve command");
        };

        assert_eq!(config.listen, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.stack, MiddlewareStack::Dev);
        assert_eq!(config.keys.private_key, PathBuf::from("/keys/current.pem"));
        assert_eq!(
            config.keys.fallback_keys,
            vec![
                PathBuf::from("/keys/previous.pem"),
                PathBuf::from("/keys/oldest.pem")
            ]
        );
        assert_eq!(
            config.scope_rules,
            vec![
                ScopeRule::new("mender.users")
                    .on_resource("management")
                    .on_action("GET")
            ]
        );
        assert_eq!(
            config.authorizer_url.map(String::from),
            Some("http://policy.local/decide".to_owned())
        );
    }

    #[test]
    fn it_rejects_unknown_middleware_stacks() {
        let error = parse(&["--stack", "staging"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn it_replaces_the_gated_endpoints() {
        let Ok(Command::Serve(config)) = parse(&["--gated-path", "/api/a/,/api/b"]) else {
            panic!("expected the serve command");
        };

        let gated = config.gated_endpoints();
        assert!(gated.is_gated("/api/a"));
        assert!(gated.is_gated("/api/b"));
        assert!(!gated.is_gated(warden_gate::INTERNAL_VERIFY_PATH));
    }

    #[test]
    fn it_parses_issue_arguments() {
        let Ok(Command::Issue(args)) = parse(&[
            "issue",
            "--subject",
            "user-1",
            "--tenant",
            "tenant-1",
            "--user",
            "--expires-in",
            "-5",
        ]) else {
            panic!("expected the issue command");
        };

        assert_eq!(args.subject, "user-1");
        assert_eq!(args.scope, warden_capability::SCOPE_ALL);
        assert_eq!(args.tenant.as_deref(), Some("tenant-1"));
        assert!(args.user);
        assert_eq!(args.expires_in, -5);
    }
}

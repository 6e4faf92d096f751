use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cryptodash::UpstreamConfig;

/// Command line interface for the cryptodash backend
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://crypto.db?mode=rwc", global = true)]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Check every active price alert once and send due notifications
    CheckAlerts(UpstreamArgs),
    /// List users without an e-mail address
    CheckUserEmails,
    /// Set the e-mail address of a user
    SetUserEmail {
        username: String,
        email: String,
        /// Overwrite an address the user already has
        #[arg(long)]
        replace: bool,
    },
    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AttemptStoreKind {
    /// Per-process counters, lost on restart
    #[default]
    Memory,
    /// Counters in the database, shared across processes
    Sqlite,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    pub bind_addr: SocketAddr,

    #[arg(long, env = "MEDIA_ROOT", default_value = "./media")]
    pub media_root: String,

    /// Base for absolute URLs; the request's Host header when unset
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Comma-separated list of allowed origins
    #[arg(
        long,
        env = "CORS_ALLOWED_ORIGINS",
        default_value = "http://localhost:3000",
        value_delimiter = ','
    )]
    pub cors_allowed_origins: Vec<String>,

    #[arg(long, env = "COOKIE_SECURE", default_value_t = false, action = clap::ArgAction::Set)]
    pub cookie_secure: bool,

    #[arg(long, env = "CSRF_ENFORCED", default_value_t = true, action = clap::ArgAction::Set)]
    pub csrf_enforced: bool,

    #[arg(long, env = "ATTEMPT_STORE", value_enum, default_value_t = AttemptStoreKind::Memory)]
    pub attempt_store: AttemptStoreKind,

    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Debug, Clone, Args)]
pub struct UpstreamArgs {
    #[arg(long, env = "TECHNICAL_ANALYSIS_SERVICE_URL", default_value = cryptodash::upstream::DEFAULT_TECHNICAL_ANALYSIS_URL)]
    pub technical_analysis_url: String,

    #[arg(long, env = "LSTM_SERVICE_URL", default_value = cryptodash::upstream::DEFAULT_LSTM_URL)]
    pub lstm_url: String,

    #[arg(long, env = "SENTIMENT_ANALYSIS_SERVICE_URL", default_value = cryptodash::upstream::DEFAULT_SENTIMENT_URL)]
    pub sentiment_url: String,

    #[arg(long, env = "NOTIFICATION_SERVICE_URL", default_value = cryptodash::upstream::DEFAULT_NOTIFICATION_URL)]
    pub notification_url: String,
}

impl From<UpstreamArgs> for UpstreamConfig {
    fn from(args: UpstreamArgs) -> Self {
        Self {
            technical_analysis_url: args.technical_analysis_url,
            lstm_url: args.lstm_url,
            sentiment_url: args.sentiment_url,
            notification_url: args.notification_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["cryptodash", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind_addr.port(), 8000);
        assert!(args.csrf_enforced);
        assert!(!args.cookie_secure);
        assert_eq!(args.attempt_store, AttemptStoreKind::Memory);
        assert_eq!(args.cors_allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "cryptodash",
            "serve",
            "--attempt-store",
            "sqlite",
            "--csrf-enforced",
            "false",
            "--cors-allowed-origins",
            "http://a.test,http://b.test",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.attempt_store, AttemptStoreKind::Sqlite);
        assert!(!args.csrf_enforced);
        assert_eq!(args.cors_allowed_origins.len(), 2);
    }

    #[test]
    fn test_set_user_email_args() {
        let cli =
            Cli::try_parse_from(["cryptodash", "set-user-email", "alice", "alice@example.com"])
                .unwrap();
        let Commands::SetUserEmail {
            username,
            email,
            replace,
        } = cli.command
        else {
            panic!("expected set-user-email");
        };
        assert_eq!(username, "alice");
        assert_eq!(email, "alice@example.com");
        assert!(!replace);

        let cli = Cli::try_parse_from([
            "cryptodash",
            "set-user-email",
            "alice",
            "alice@example.com",
            "--replace",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::SetUserEmail { replace: true, .. }
        ));

        assert!(Cli::try_parse_from(["cryptodash", "set-user-email", "alice"]).is_err());
        assert!(matches!(
            Cli::try_parse_from(["cryptodash", "check-user-emails"])
                .unwrap()
                .command,
            Commands::CheckUserEmails
        ));
    }
}

use argh::FromArgs;

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
/// Dynamic forms server
pub struct SiteCommand {
    #[argh(subcommand)]
    pub nested: NestedCommand,

    #[argh(switch, short = 'v', long = "verbose")]
    /// enable verbose output
    pub verbose: bool,
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand)]
pub enum NestedCommand {
    Serve(ServeCommand),
    Migrate(MigrateCommand),
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand, name = "serve")]
/// Serve the API
pub struct ServeCommand {
    #[argh(option)]
    /// host to bind the server to (defaults to HOST)
    pub host: Option<String>,

    #[argh(option)]
    /// port to bind the server to (defaults to PORT)
    pub port: Option<u16>,

    #[argh(switch)]
    /// keep all data in memory instead of Postgres
    pub memory: bool,
}

#[derive(FromArgs, PartialEq, Eq, Debug, Clone)]
#[argh(subcommand, name = "migrate")]
/// Apply database migrations
pub struct MigrateCommand {}

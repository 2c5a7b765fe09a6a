use crate::{availability::SlotGrid, configuration::Configuration, error::GridError};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Tennis court booking service")]
pub struct Arguments {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: String,

    /// Password required for admin routes (x-admin-password header)
    #[arg(long, env = "ADMIN_PASSWORD")]
    password: String,

    /// First bookable hour of the day
    #[arg(long, env = "OPEN_HOUR", default_value_t = 6)]
    open_hour: u32,

    /// Closing hour, the last slot ends here
    #[arg(long, env = "CLOSE_HOUR", default_value_t = 23)]
    close_hour: u32,

    /// Slot granularity in minutes
    #[arg(long, env = "SLOT_MINUTES", default_value_t = 30)]
    slot_minutes: u32,

    /// Insert a few example courts on startup
    #[arg(long, env = "SEED_EXAMPLE_COURTS")]
    seed_example_courts: bool,
}

#[cfg(test)]
impl Arguments {
    /// Parses `args` the way the binary does, without environment fallbacks.
    pub fn try_parse_without_env(args: &[&str]) -> Result<Self, clap::Error> {
        use clap::{CommandFactory, FromArgMatches};

        let matches = Self::command()
            .mut_args(|arg| arg.env(None))
            .try_get_matches_from(std::iter::once("court_booking").chain(args.iter().copied()))?;
        Self::from_arg_matches(&matches)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationHandler {
    arguments: Arguments,
    slot_grid: SlotGrid,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Result<Self, GridError> {
        Self::from_arguments(Arguments::parse())
    }

    pub fn from_arguments(arguments: Arguments) -> Result<Self, GridError> {
        let slot_grid = SlotGrid::new(
            arguments.slot_minutes,
            arguments.open_hour,
            arguments.close_hour,
        )?;
        Ok(Self {
            arguments,
            slot_grid,
        })
    }
}

impl Configuration for ConfigurationHandler {
    fn password(&self) -> String {
        self.arguments.password.clone()
    }

    fn port(&self) -> String {
        self.arguments.port.clone()
    }

    fn slot_grid(&self) -> SlotGrid {
        self.slot_grid
    }

    fn seed_example_courts(&self) -> bool {
        self.arguments.seed_example_courts
    }
}

use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::BTreeMap, env, str::FromStr};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("invalid logger spec '{0}'")]
    ParseLoggerSpec(String),

    #[error("log appender setup failed: {0}")]
    AppenderSetup(String),

    #[error("log configuration rejected: {0}")]
    Config(String),

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

/// A parsed set of logger filters, e.g. `info,bobtail_consensus=trace`.
///
/// A bare level sets the root level. A `target=level` pair sets the level of a
/// single module path. A bare target enables everything for it.
#[derive(Clone, Debug, Default)]
pub struct Filters {
    root_level: Option<LevelFilter>,
    targets: BTreeMap<String, LevelFilter>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_level(mut self, level: LevelFilter) -> Self {
        self.root_level = Some(level);
        self
    }

    /// Applies the expression found in environment variable `var`, if any
    pub fn parse_env(mut self, var: &str) -> Self {
        if let Ok(expression) = env::var(var) {
            self.apply_expression(&expression);
        }
        self
    }

    pub fn parse_expression(mut self, expression: &str) -> Self {
        self.apply_expression(expression);
        self
    }

    fn apply_expression(&mut self, expression: &str) {
        for spec in expression.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match parse_spec(spec) {
                Ok((None, level)) => self.root_level = Some(level),
                Ok((Some(target), level)) => {
                    self.targets.insert(target.to_owned(), level);
                }
                // The logger is not up yet, so stderr is all we have
                Err(err) => eprintln!("Ignoring logging spec: {}", err),
            }
        }
    }

    pub fn root_level(&self) -> LevelFilter {
        self.root_level.unwrap_or(LevelFilter::Error)
    }

    pub fn target_level(&self, target: &str) -> Option<LevelFilter> {
        self.targets.get(target).copied()
    }

    pub(super) fn loggers<'a>(&'a self, appenders: &'a [&'static str]) -> impl Iterator<Item = Logger> + 'a {
        self.targets.iter().map(move |(target, level)| {
            Logger::builder().appenders(appenders.iter().map(|x| x.to_string())).additive(false).build(target.clone(), *level)
        })
    }
}

fn parse_spec(spec: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
    let mut parts = spec.split('=').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(single), None, None) => match single.parse() {
            Ok(level) => Ok((None, level)),
            Err(_) => Ok((Some(single), LevelFilter::max())),
        },
        (Some(target), Some(""), None) => Ok((Some(target), LevelFilter::max())),
        (Some(target), Some(level), None) => {
            level.parse().map(|level| (Some(target), level)).map_err(|_| LogError::ParseLoggerSpec(spec.to_owned()))
        }
        _ => Err(LogError::ParseLoggerSpec(spec.to_owned())),
    }
}

impl FromStr for Filters {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filters = Self::new();
        for spec in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match parse_spec(spec)? {
                (None, level) => filters.root_level = Some(level),
                (Some(target), level) => {
                    filters.targets.insert(target.to_owned(), level);
                }
            }
        }
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_expression() {
        let filters = Filters::new().parse_expression("info, bobtail_consensus=trace ,bobtail_database=, simpa");
        assert_eq!(filters.root_level(), LevelFilter::Info);
        assert_eq!(filters.target_level("bobtail_consensus"), Some(LevelFilter::Trace));
        assert_eq!(filters.target_level("bobtail_database"), Some(LevelFilter::max()));
        assert_eq!(filters.target_level("simpa"), Some(LevelFilter::max()));
        assert_eq!(filters.target_level("unknown"), None);
    }

    #[test]
    fn test_filters_invalid_specs() {
        // Invalid specs are skipped by the lenient parser
        let filters = Filters::new().with_root_level(LevelFilter::Warn).parse_expression("a=b=c,bobtail=loud,debug");
        assert_eq!(filters.root_level(), LevelFilter::Debug);
        assert_eq!(filters.target_level("bobtail"), None);

        // and reported by the strict one
        assert_eq!("bobtail=loud".parse::<Filters>().unwrap_err(), LogError::ParseLoggerSpec("bobtail=loud".to_owned()));
        assert_eq!(Filters::new().root_level(), LevelFilter::Error);
    }
}

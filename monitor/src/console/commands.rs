use seaxcore::ais_interface::Viewport;
use seaxcore::classify::{GeneralStatus, ShipCategory};
use std::collections::HashSet;
use std::str::FromStr;

pub const HELP: &str = "\
view <minLat> <minLon> <maxLat> <maxLon>   move the map and refetch
dismiss <vid>                              drop a notification
track <mmsi>                               show a vessel's position
fleet <mmsi> on|off                        mark fleet membership
filter fleet on|off                        only show fleet vessels
filter type <cat,...>                      cargo,tanker,pleasure,passenger,fishing,special,misc
filter status <st,...>                     underway,atanchor,restricted,moored,aground,fishing,unknown
filter speed <min> <max>                   speed range in knots
filter clear                               reset all filters
list | notes | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    View(Viewport),
    Dismiss(String),
    Track(u64),
    Fleet { mmsi: u64, in_fleet: bool },
    FilterFleet(bool),
    FilterTypes(HashSet<ShipCategory>),
    FilterStatuses(HashSet<GeneralStatus>),
    FilterSpeed(f64, f64),
    FilterClear,
    List,
    Notes,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["view", min_lat, min_lon, max_lat, max_lon] => {
                let min_lat = number(min_lat)?;
                let min_lon = number(min_lon)?;
                let max_lat = number(max_lat)?;
                let max_lon = number(max_lon)?;
                if min_lat >= max_lat || min_lon >= max_lon {
                    return Err("view needs minLat < maxLat and minLon < maxLon".into());
                }
                Ok(ConsoleCommand::View(Viewport::from_limits(
                    min_lat, min_lon, max_lat, max_lon,
                )))
            }
            ["dismiss", vid] => Ok(ConsoleCommand::Dismiss((*vid).to_string())),
            ["track", mmsi] => Ok(ConsoleCommand::Track(mmsi_of(mmsi)?)),
            ["fleet", mmsi, flag] => Ok(ConsoleCommand::Fleet {
                mmsi: mmsi_of(mmsi)?,
                in_fleet: switch(flag)?,
            }),
            ["filter", "fleet", flag] => Ok(ConsoleCommand::FilterFleet(switch(flag)?)),
            ["filter", "type", rest @ ..] => Ok(ConsoleCommand::FilterTypes(set_of(rest)?)),
            ["filter", "status", rest @ ..] => Ok(ConsoleCommand::FilterStatuses(set_of(rest)?)),
            ["filter", "speed", min, max] => {
                let (min, max) = (number(min)?, number(max)?);
                if min > max {
                    return Err(format!("speed range {} > {}", min, max));
                }
                Ok(ConsoleCommand::FilterSpeed(min, max))
            }
            ["filter", "clear"] => Ok(ConsoleCommand::FilterClear),
            ["list"] => Ok(ConsoleCommand::List),
            ["notes"] => Ok(ConsoleCommand::Notes),
            ["help"] | ["?"] => Ok(ConsoleCommand::Help),
            ["quit"] | ["exit"] => Ok(ConsoleCommand::Quit),
            [] => Err("empty command".into()),
            _ => Err(format!("unknown command: {}", line.trim())),
        }
    }
}

fn number(word: &str) -> Result<f64, String> {
    word.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("not a number: {}", word))
}

fn mmsi_of(word: &str) -> Result<u64, String> {
    word.parse().map_err(|_| format!("not an MMSI: {}", word))
}

fn switch(word: &str) -> Result<bool, String> {
    match word {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on|off, got {}", other)),
    }
}

/// Comma and/or space separated list; an empty list clears the set.
fn set_of<T>(words: &[&str]) -> Result<HashSet<T>, String>
where
    T: FromStr<Err = String> + Eq + std::hash::Hash,
{
    words
        .iter()
        .flat_map(|word| word.split(','))
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_view_rectangle() {
        let command: ConsoleCommand = "view 47 -6 49 -3".parse().unwrap();
        assert_eq!(
            command,
            ConsoleCommand::View(Viewport::from_limits(47.0, -6.0, 49.0, -3.0))
        );
        assert!("view 49 -6 47 -3".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn parses_filter_sets() {
        let command: ConsoleCommand = "filter type cargo, tanker".parse().unwrap();
        let expected: HashSet<ShipCategory> =
            [ShipCategory::Cargo, ShipCategory::Tanker].into_iter().collect();
        assert_eq!(command, ConsoleCommand::FilterTypes(expected));

        let command: ConsoleCommand = "filter status moored,underway".parse().unwrap();
        let expected: HashSet<GeneralStatus> =
            [GeneralStatus::Moored, GeneralStatus::Underway].into_iter().collect();
        assert_eq!(command, ConsoleCommand::FilterStatuses(expected));

        assert_eq!(
            "filter type".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::FilterTypes(HashSet::new())
        );
        assert!("filter type submarine".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn parses_fleet_and_speed() {
        assert_eq!(
            "fleet 228000001 on".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Fleet {
                mmsi: 228000001,
                in_fleet: true
            }
        );
        assert_eq!(
            "filter speed 2 15.5".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::FilterSpeed(2.0, 15.5)
        );
        assert!("filter speed 9 1".parse::<ConsoleCommand>().is_err());
        assert!("fleet abc on".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn rejects_unknown_input() {
        assert!("".parse::<ConsoleCommand>().is_err());
        assert!("launch torpedoes".parse::<ConsoleCommand>().is_err());
        assert_eq!("quit".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Quit);
    }
}

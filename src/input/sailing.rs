//! Code for reading the sailing times CSV file.
use super::*;
use crate::error::PlanningError;
use crate::id::IDCollection;
use crate::port::PortMap;
use crate::sailing::SailingTimeTable;
use crate::units::Hours;
use anyhow::ensure;
use serde::Deserialize;

const SAILING_TIMES_FILE_NAME: &str = "sailing_times.csv";

/// A row of the sailing times CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct SailingTimeRaw {
    from: String,
    to: String,
    hours: Hours,
}

/// Read sailing times from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `ports` - All known ports
/// * `symmetric` - Whether to fill in missing reverse entries from the forward ones
pub fn read_sailing_times(
    model_dir: &Path,
    ports: &PortMap,
    symmetric: bool,
) -> Result<SailingTimeTable> {
    let file_path = model_dir.join(SAILING_TIMES_FILE_NAME);
    let sailing_times_csv = read_csv(&file_path)?;
    let mut table = read_sailing_times_from_iter(sailing_times_csv, ports)
        .with_context(|| input_err_msg(&file_path))?;

    if symmetric {
        let added = table.add_reverse_entries();
        info!("Added {added} reverse sailing times");
    }

    Ok(table)
}

fn read_sailing_times_from_iter<I>(iter: I, ports: &PortMap) -> Result<SailingTimeTable>
where
    I: Iterator<Item = SailingTimeRaw>,
{
    let mut table = SailingTimeTable::new();
    for raw in iter {
        let from = ports
            .get_id(&raw.from)
            .map_err(|_| PlanningError::invalid("from", format!("Unknown port {}", raw.from)))?;
        let to = ports
            .get_id(&raw.to)
            .map_err(|_| PlanningError::invalid("to", format!("Unknown port {}", raw.to)))?;
        ensure!(from != to, "Sailing time from {from} to itself given");

        if !(raw.hours.is_finite() && raw.hours.value() >= 0.0) {
            Err(PlanningError::invalid(
                format!("hours from {from} to {to}"),
                "must be a finite, non-negative number",
            ))?;
        }

        ensure!(
            table.insert(from.clone(), to.clone(), raw.hours).is_none(),
            "Duplicate sailing time from {from} to {to}"
        );
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, ports};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw(from: &str, to: &str, hours: f64) -> SailingTimeRaw {
        SailingTimeRaw {
            from: from.into(),
            to: to.into(),
            hours: Hours(hours),
        }
    }

    #[rstest]
    fn test_read_sailing_times(ports: PortMap) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SAILING_TIMES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "from,to,hours
L1,U1,12
U1,U2,6.5"
            )
            .unwrap();
        }

        let table = read_sailing_times(dir.path(), &ports, false).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&"U1".into(), &"U2".into()), Ok(Hours(6.5)));

        let table = read_sailing_times(dir.path(), &ports, true).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(&"U2".into(), &"U1".into()), Ok(Hours(6.5)));
    }

    #[rstest]
    fn test_read_sailing_times_unknown_port(ports: PortMap) {
        let err = read_sailing_times_from_iter([raw("L1", "X1", 1.0)].into_iter(), &ports)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlanningError>(),
            Some(&PlanningError::invalid("to", "Unknown port X1"))
        );
    }

    #[rstest]
    #[case(raw("L1", "L1", 1.0), "Sailing time from L1 to itself given")]
    fn test_read_sailing_times_self(ports: PortMap, #[case] row: SailingTimeRaw, #[case] msg: &str) {
        assert_error!(read_sailing_times_from_iter([row].into_iter(), &ports), msg);
    }

    #[rstest]
    fn test_read_sailing_times_duplicate(ports: PortMap) {
        let rows = [raw("L1", "U1", 1.0), raw("L1", "U1", 2.0)];
        assert_error!(
            read_sailing_times_from_iter(rows.into_iter(), &ports),
            "Duplicate sailing time from L1 to U1"
        );
    }

    #[rstest]
    fn test_read_sailing_times_negative(ports: PortMap) {
        let rows = [raw("L1", "U1", -1.0)];
        assert!(read_sailing_times_from_iter(rows.into_iter(), &ports).is_err());
    }
}

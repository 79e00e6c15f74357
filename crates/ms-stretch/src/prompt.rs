//! Interactive station selection for `--ask`.

use std::io::{BufRead, Write};

/// List `available` and read station names until an empty line.
///
/// Returns the names in input order. `all` is accepted as a name.
pub fn ask_stations<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    forcing: &str,
    available: &[String],
) -> std::io::Result<Vec<String>> {
    writeln!(output, "--------------------------------------------")?;
    writeln!(output, "Choose any number of {} stations.", forcing)?;
    writeln!(output, "Type the name without the '.csv' ending.")?;
    writeln!(output, "Available stations:")?;
    for name in available {
        writeln!(output, "  {}", name)?;
    }
    writeln!(output, "You can also choose 'all'. Finish with an empty line.")?;
    writeln!(output, "--------------------------------------------")?;

    let mut stations = Vec::new();
    loop {
        write!(output, "{}. Station: ", stations.len() + 1)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let name = line.trim();
        if name.is_empty() {
            break;
        }
        if !name.eq_ignore_ascii_case("all") && !available.iter().any(|a| a == name) {
            tracing::warn!("Station {} is not in the list", name);
        }
        stations.push(name.to_string());
    }
    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_until_empty_line() {
        let mut input = Cursor::new("Daguan\nWanrong\n\nignored\n");
        let mut output = Vec::new();
        let available = vec!["Daguan".to_string(), "Wanrong".to_string()];

        let stations = ask_stations(&mut input, &mut output, "Precipitation", &available).unwrap();
        assert_eq!(stations, available);

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Precipitation"));
        assert!(text.contains("  Daguan\n"));
        assert!(text.contains("3. Station: "));
    }

    #[test]
    fn test_eof_ends_selection() {
        let mut input = Cursor::new("all");
        let mut output = Vec::new();
        let stations = ask_stations(&mut input, &mut output, "Pressure", &[]).unwrap();
        assert_eq!(stations, vec!["all".to_string()]);
    }
}

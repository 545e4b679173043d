/// Parsing of uploaded box ID lists
///
/// The expected layout is a header line followed by `boxId,activationDate`
/// rows. Extra columns are ignored.

/// One valid row of an uploaded list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxIdRow {
    pub box_id: String,
    pub activation_date: String,
}

pub fn parse_box_ids(content: &str) -> Vec<BoxIdRow> {
    content
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let mut fields = line.split(',').map(str::trim);
            let box_id = fields.next()?;
            let activation_date = fields.next()?;
            if box_id.is_empty() || activation_date.is_empty() {
                return None;
            }
            Some(BoxIdRow {
                box_id: box_id.to_string(),
                activation_date: activation_date.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_header_and_invalid_rows() {
        let content = "\nboxId,activationDate\nNT-0001, 2025-12-31\n\nNT-0002\n,2025-01-01\r\nNT-0003,2026-01-01,extra\n";
        let rows = parse_box_ids(content);
        assert_eq!(
            rows,
            vec![
                BoxIdRow {
                    box_id: "NT-0001".to_string(),
                    activation_date: "2025-12-31".to_string(),
                },
                BoxIdRow {
                    box_id: "NT-0003".to_string(),
                    activation_date: "2026-01-01".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_header_only_yields_nothing() {
        assert!(parse_box_ids("boxId,activationDate").is_empty());
        assert!(parse_box_ids("").is_empty());
    }
}

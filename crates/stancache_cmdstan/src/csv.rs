//! Parsing of CmdStan's CSV output into draw vectors.
//!
//! A Stan CSV file is `#`-prefixed comment lines interleaved with one
//! header row and numeric draw rows. Columns whose name ends in `__`
//! (`lp__`, `divergent__`, ...) are sampler bookkeeping; the rest are
//! model variables, with container elements spread over indexed columns
//! like `x.1`, `x.2` that share a base name.

use std::collections::BTreeMap;

use stancache_core::CacheError;

pub(crate) type Draws = BTreeMap<String, Vec<f64>>;

/// Parses one chain's CSV text into (stan_variables, method_variables).
///
/// Draws for indexed columns are appended per base variable in column
/// order. Malformed content is an [`CacheError::Execution`] — the sampler
/// claimed success but its output is unusable, and nothing gets cached.
pub(crate) fn parse_stan_csv(text: &str) -> Result<(Draws, Draws), CacheError> {
    let mut lines = text
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty());

    let header = lines.next().ok_or_else(|| malformed("missing header row"))?;
    let columns: Vec<&str> = header.split(',').collect();

    let mut per_column: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != columns.len() {
            return Err(malformed(&format!(
                "row has {} fields, header has {}",
                fields.len(),
                columns.len()
            )));
        }
        for (column, field) in per_column.iter_mut().zip(&fields) {
            let value: f64 = field
                .trim()
                .parse()
                .map_err(|_| malformed(&format!("non-numeric field '{field}'")))?;
            column.push(value);
        }
    }

    let mut stan_variables = Draws::new();
    let mut method_variables = Draws::new();
    for (name, draws) in columns.iter().zip(per_column) {
        if name.ends_with("__") {
            method_variables.insert(name.to_string(), draws);
        } else {
            let base = name.split('.').next().unwrap_or(name);
            stan_variables
                .entry(base.to_string())
                .or_default()
                .extend(draws);
        }
    }

    Ok((stan_variables, method_variables))
}

/// Appends one chain's draws onto the accumulated draws.
pub(crate) fn merge_draws(into: &mut Draws, from: Draws) {
    for (name, draws) in from {
        into.entry(name).or_default().extend(draws);
    }
}

fn malformed(reason: &str) -> CacheError {
    CacheError::Execution {
        diagnostic: format!("malformed sampler CSV output: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# stan_version_major = 2
lp__,accept_stat__,mu,x.1,x.2
# Adaptation terminated
-5.1,0.9,0.25,1.0,2.0
-5.3,0.8,0.35,3.0,4.0
";

    #[test]
    fn splits_method_and_model_variables() {
        let (stan, method) = parse_stan_csv(SAMPLE).unwrap();
        assert_eq!(stan.get("mu").unwrap(), &[0.25, 0.35]);
        assert_eq!(method.get("lp__").unwrap(), &[-5.1, -5.3]);
        assert_eq!(method.get("accept_stat__").unwrap(), &[0.9, 0.8]);
        assert!(!stan.contains_key("lp__"));
    }

    #[test]
    fn indexed_columns_share_a_base_name() {
        let (stan, _) = parse_stan_csv(SAMPLE).unwrap();
        // Column order: all of x.1's draws, then x.2's.
        assert_eq!(stan.get("x").unwrap(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn comment_lines_are_skipped_anywhere() {
        let (stan, _) = parse_stan_csv(SAMPLE).unwrap();
        assert_eq!(stan.get("mu").unwrap().len(), 2);
    }

    #[test]
    fn empty_input_is_an_execution_error() {
        let err = parse_stan_csv("# only comments\n").unwrap_err();
        assert!(matches!(err, CacheError::Execution { .. }));
    }

    #[test]
    fn ragged_row_is_an_execution_error() {
        let err = parse_stan_csv("a,b\n1.0\n").unwrap_err();
        assert!(err.to_string().contains("fields"));
    }

    #[test]
    fn non_numeric_field_is_an_execution_error() {
        let err = parse_stan_csv("a,b\n1.0,oops\n").unwrap_err();
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn merge_appends_in_chain_order() {
        let mut acc = Draws::new();
        acc.insert("mu".to_string(), vec![1.0]);
        let mut next = Draws::new();
        next.insert("mu".to_string(), vec![2.0]);
        next.insert("tau".to_string(), vec![3.0]);
        merge_draws(&mut acc, next);
        assert_eq!(acc.get("mu").unwrap(), &[1.0, 2.0]);
        assert_eq!(acc.get("tau").unwrap(), &[3.0]);
    }
}

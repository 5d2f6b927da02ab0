//! Reader for the libsvm text format
//!
//! One point per line, `<target> <index>:<value> ...`, with 1-based feature
//! indices in any order:
//!
//! ```text
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//! ```
//!
//! Targets are kept as written: class ids for classification, real values
//! for regression. Blank lines and `#` comments are skipped.

use crate::core::{Dataset, Result, SVMError, Sample, SparseVector};
use crate::data::MemoryDataset;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Points read from a libsvm-format source
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    samples: Vec<Sample>,
    dimensions: usize,
}

impl LibSVMDataset {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut samples = Vec::new();

        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let content = match line.split_once('#') {
                Some((before, _)) => before,
                None => line.as_str(),
            }
            .trim();
            if content.is_empty() {
                continue;
            }

            let sample = parse_line(content)
                .map_err(|e| SVMError::ParseError(format!("line {}: {}", n + 1, e)))?;
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let dimensions = samples.iter().map(|s| s.features.dim()).max().unwrap_or(0);
        Ok(Self {
            samples,
            dimensions,
        })
    }
}

fn parse_line(line: &str) -> std::result::Result<Sample, String> {
    let mut tokens = line.split_whitespace();
    let target = tokens.next().ok_or("missing target")?;
    let label = target
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid target '{}'", target))?;

    let (indices, values): (Vec<usize>, Vec<f64>) = tokens
        .map(parse_feature)
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();

    Ok(Sample::new(SparseVector::new(indices, values), label))
}

/// `index:value` with a 1-based index, returned 0-based
fn parse_feature(token: &str) -> std::result::Result<(usize, f64), String> {
    let (index, value) = token
        .split_once(':')
        .ok_or_else(|| format!("expected index:value, got '{}'", token))?;
    let index = match index.parse::<usize>() {
        Ok(0) => return Err("feature indices start at 1".to_string()),
        Ok(i) => i - 1,
        Err(_) => return Err(format!("invalid feature index '{}'", index)),
    };
    let value = value
        .parse::<f64>()
        .map_err(|_| format!("invalid feature value '{}'", value))?;
    Ok((index, value))
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn sample(&self, i: usize) -> &Sample {
        &self.samples[i]
    }
}

impl From<LibSVMDataset> for MemoryDataset {
    fn from(dataset: LibSVMDataset) -> Self {
        MemoryDataset::new(dataset.samples)
    }
}

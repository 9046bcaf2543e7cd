//! Touchstone file parser
//!
//! Reads Touchstone v1 (`.sNp`) and v2 (`.ts`) files into frequency, raw
//! parameter matrices, reference impedances and header comments.

use num_complex::Complex64;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::frequency::{Frequency, FrequencyUnit};

/// Touchstone parsing errors
#[derive(Error, Debug)]
pub enum TouchstoneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid option line: {0}")]
    InvalidOption(String),

    #[error("Invalid file extension: expected .sNp or .ts")]
    InvalidExtension,

    #[error("Unsupported parameter type {0:?}: only S, Y and Z data can be converted")]
    UnsupportedParameter(ParameterType),

    #[error("Invalid network data: {0}")]
    Network(#[from] crate::error::NetworkError),
}

/// S-parameter data format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SParamFormat {
    #[default]
    RI, // Real-Imaginary
    MA, // Magnitude-Angle (degrees)
    DB, // dB-Angle (degrees)
}

impl SParamFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RI" => Some(SParamFormat::RI),
            "MA" => Some(SParamFormat::MA),
            "DB" => Some(SParamFormat::DB),
            _ => None,
        }
    }

    /// Interpret a value pair in this format
    fn to_complex(self, v1: f64, v2: f64) -> Complex64 {
        match self {
            SParamFormat::RI => Complex64::new(v1, v2),
            SParamFormat::MA => Complex64::from_polar(v1, v2.to_radians()),
            SParamFormat::DB => Complex64::from_polar(10.0_f64.powf(v1 / 20.0), v2.to_radians()),
        }
    }
}

/// Network parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterType {
    #[default]
    S,
    Y,
    Z,
    G,
    H,
}

impl ParameterType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "S" => Some(ParameterType::S),
            "Y" => Some(ParameterType::Y),
            "Z" => Some(ParameterType::Z),
            "G" => Some(ParameterType::G),
            "H" => Some(ParameterType::H),
            _ => None,
        }
    }
}

/// Matrix storage of a v2 file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixFormat {
    #[default]
    Full,
    Lower,
    Upper,
}

/// Touchstone file contents
#[derive(Debug, Clone)]
pub struct Touchstone {
    /// Number of ports
    pub nports: usize,
    /// Frequency data
    pub frequency: Frequency,
    /// Parameter data matrices: [nfreq][nports][nports], as stored in the file
    pub s: Vec<Vec<Vec<Complex64>>>,
    /// Reference impedance (per port)
    pub z0: Vec<f64>,
    /// Comment lines, text after the leading `!`
    pub comments: Vec<String>,
    /// Original format
    pub format: SParamFormat,
    /// Parameter type (S, Y, Z, G, H)
    pub param_type: ParameterType,
    /// Is this a Version 2.0 file?
    pub is_v2: bool,
}

impl Touchstone {
    /// Parse a Touchstone file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TouchstoneError> {
        let path = path.as_ref();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(TouchstoneError::InvalidExtension)?;
        let nports = Self::parse_extension(ext)?;

        let file = File::open(path)?;
        Self::parse(BufReader::new(file), nports)
    }

    /// Number of ports implied by a file extension; 0 for `.ts` (read from the file)
    pub fn parse_extension(ext: &str) -> Result<usize, TouchstoneError> {
        let ext_lower = ext.to_lowercase();
        if ext_lower == "ts" {
            return Ok(0);
        }
        if ext_lower.len() > 2 && ext_lower.starts_with('s') && ext_lower.ends_with('p') {
            return ext_lower[1..ext_lower.len() - 1]
                .parse::<usize>()
                .map_err(|_| TouchstoneError::InvalidExtension);
        }
        Err(TouchstoneError::InvalidExtension)
    }

    /// Parse from string content
    ///
    /// # Example
    /// ```
    /// use s2spice_core::touchstone::Touchstone;
    /// let content = "# GHz S RI R 50\n1.0 0.1 0.0 0.9 0.0 0.9 0.0 0.1 0.0";
    /// let ts = Touchstone::from_str(content, 2).unwrap();
    /// assert_eq!(ts.nfreq(), 1);
    /// ```
    pub fn from_str(content: &str, nports: usize) -> Result<Self, TouchstoneError> {
        Self::parse(std::io::Cursor::new(content), nports)
    }

    fn parse<R: BufRead>(reader: R, nports_hint: usize) -> Result<Self, TouchstoneError> {
        let mut state = ParserState::new(nports_hint);

        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            state.line = idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if let Some(comment) = trimmed.strip_prefix('!') {
                state.comments.push(comment.to_string());
                continue;
            }

            if trimmed.starts_with('[') {
                state.parse_keyword(trimmed)?;
                continue;
            }

            if trimmed.starts_with('#') {
                if !state.option_parsed {
                    state.parse_option_line(trimmed)?;
                }
                continue;
            }

            if state.expecting_reference {
                state.continue_reference(trimmed)?;
                continue;
            }

            if state.stopped {
                continue;
            }

            // V1 data is implicit; V2 data must follow [Network Data]
            if !state.is_v2 || state.data_section_started {
                state.parse_data_line(trimmed)?;
            }
        }

        state.finalize()
    }

    /// Parse the option line (# Hz S RI R 50)
    pub fn parse_option_line(
        line: &str,
    ) -> Result<(FrequencyUnit, SParamFormat, f64, ParameterType), TouchstoneError> {
        let body = line
            .strip_prefix('#')
            .ok_or_else(|| TouchstoneError::InvalidOption(line.to_string()))?;
        let parts: Vec<&str> = body.split_whitespace().collect();

        let mut freq_unit = FrequencyUnit::GHz;
        let mut format = SParamFormat::MA;
        let mut z0 = 50.0;
        let mut param_type = ParameterType::S;

        let mut i = 0;
        while i < parts.len() {
            let part = parts[i];

            if let Some(unit) = FrequencyUnit::from_str(part) {
                freq_unit = unit;
            } else if let Some(fmt) = SParamFormat::from_str(part) {
                format = fmt;
            } else if let Some(pt) = ParameterType::from_str(part) {
                param_type = pt;
            } else if part.eq_ignore_ascii_case("R") {
                z0 = parts
                    .get(i + 1)
                    .and_then(|v| v.parse::<f64>().ok())
                    .ok_or_else(|| TouchstoneError::InvalidOption(line.to_string()))?;
                i += 1;
            } else {
                return Err(TouchstoneError::InvalidOption(line.to_string()));
            }

            i += 1;
        }

        Ok((freq_unit, format, z0, param_type))
    }

    /// Get the number of frequency points
    pub fn nfreq(&self) -> usize {
        self.s.len()
    }
}

struct ParserState {
    line: usize,
    nports: usize,
    freq_unit: FrequencyUnit,
    format: SParamFormat,
    matrix_format: MatrixFormat,
    z0: Vec<f64>,
    param_type: ParameterType,
    comments: Vec<String>,
    option_parsed: bool,

    frequencies: Vec<f64>,
    data: Vec<Vec<Vec<Complex64>>>,
    pending: Vec<f64>,

    is_v2: bool,
    data_section_started: bool,
    two_port_order_21_12: bool,
    expecting_reference: bool,
    stopped: bool,
}

impl ParserState {
    fn new(nports_hint: usize) -> Self {
        Self {
            line: 0,
            nports: nports_hint,
            freq_unit: FrequencyUnit::GHz,
            format: SParamFormat::MA,
            matrix_format: MatrixFormat::Full,
            z0: Vec::new(),
            param_type: ParameterType::S,
            comments: Vec::new(),
            option_parsed: false,
            frequencies: Vec::new(),
            data: Vec::new(),
            pending: Vec::new(),
            is_v2: false,
            data_section_started: false,
            two_port_order_21_12: true,
            expecting_reference: false,
            stopped: false,
        }
    }

    fn error(&self, message: impl Into<String>) -> TouchstoneError {
        TouchstoneError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn parse_keyword(&mut self, line: &str) -> Result<(), TouchstoneError> {
        let line_lower = line.to_lowercase();
        let argument = line.split_once(']').map(|(_, rest)| rest.trim()).unwrap_or("");

        if line_lower.starts_with("[version]") {
            self.is_v2 = argument != "1.0";
        } else if line_lower.starts_with("[number of ports]") {
            self.nports = argument
                .parse()
                .map_err(|_| self.error(format!("invalid port count {:?}", argument)))?;
        } else if line_lower.starts_with("[two-port data order]") {
            self.two_port_order_21_12 = !argument.contains("12_21");
        } else if line_lower.starts_with("[reference]") {
            self.z0.clear();
            self.expecting_reference = true;
            self.continue_reference(argument)?;
        } else if line_lower.starts_with("[matrix format]") {
            let arg = argument.to_lowercase();
            self.matrix_format = if arg.contains("lower") {
                MatrixFormat::Lower
            } else if arg.contains("upper") {
                MatrixFormat::Upper
            } else {
                MatrixFormat::Full
            };
        } else if line_lower.starts_with("[network data]") {
            self.data_section_started = true;
        } else if line_lower.starts_with("[noise data]") || line_lower.starts_with("[end]") {
            self.data_section_started = false;
            self.stopped = true;
        }
        Ok(())
    }

    fn continue_reference(&mut self, line: &str) -> Result<(), TouchstoneError> {
        for part in line.split_whitespace() {
            let val = part
                .parse::<f64>()
                .map_err(|_| self.error(format!("invalid reference impedance {:?}", part)))?;
            self.z0.push(val);
        }
        if self.z0.len() >= self.nports {
            self.expecting_reference = false;
        }
        Ok(())
    }

    fn parse_option_line(&mut self, line: &str) -> Result<(), TouchstoneError> {
        let (u, f, z, p) = Touchstone::parse_option_line(line)?;
        self.freq_unit = u;
        self.format = f;
        self.param_type = p;
        if self.z0.is_empty() {
            self.z0 = vec![z];
        }
        self.option_parsed = true;
        Ok(())
    }

    fn values_per_point(&self) -> usize {
        let n_values = match self.matrix_format {
            MatrixFormat::Full => self.nports * self.nports,
            MatrixFormat::Lower | MatrixFormat::Upper => self.nports * (self.nports + 1) / 2,
        };
        1 + n_values * 2
    }

    fn parse_data_line(&mut self, line: &str) -> Result<(), TouchstoneError> {
        if self.nports == 0 {
            return Err(self.error("number of ports is unknown"));
        }

        let clean_line = line.split('!').next().unwrap_or("");
        for part in clean_line.split_whitespace() {
            let val = part
                .parse::<f64>()
                .map_err(|_| self.error(format!("invalid number {:?}", part)))?;
            self.pending.push(val);
        }

        let expected = self.values_per_point();
        while self.pending.len() >= expected {
            let record: Vec<f64> = self.pending.drain(0..expected).collect();
            self.push_record(&record);
        }
        Ok(())
    }

    /// Store one frequency record: `f v1 v2 v1 v2 ...`
    fn push_record(&mut self, record: &[f64]) {
        let n = self.nports;
        self.frequencies.push(record[0]);

        let mut pairs = record[1..]
            .chunks_exact(2)
            .map(|c| self.format.to_complex(c[0], c[1]));
        let mut matrix = vec![vec![Complex64::new(0.0, 0.0); n]; n];

        match self.matrix_format {
            MatrixFormat::Full => {
                for i in 0..n {
                    for j in 0..n {
                        if let Some(c) = pairs.next() {
                            matrix[i][j] = c;
                        }
                    }
                }
                // 2-port records are column-major (11 21 12 22) unless a v2 file says otherwise
                if n == 2 && (!self.is_v2 || self.two_port_order_21_12) {
                    let tmp = matrix[0][1];
                    matrix[0][1] = matrix[1][0];
                    matrix[1][0] = tmp;
                }
            }
            MatrixFormat::Lower => {
                for i in 0..n {
                    for j in 0..=i {
                        if let Some(c) = pairs.next() {
                            matrix[i][j] = c;
                            matrix[j][i] = c;
                        }
                    }
                }
            }
            MatrixFormat::Upper => {
                for i in 0..n {
                    for j in i..n {
                        if let Some(c) = pairs.next() {
                            matrix[i][j] = c;
                            matrix[j][i] = c;
                        }
                    }
                }
            }
        }

        self.data.push(matrix);
    }

    fn finalize(self) -> Result<Touchstone, TouchstoneError> {
        if self.nports == 0 {
            return Err(self.error("number of ports is unknown"));
        }
        if !self.pending.is_empty() {
            return Err(self.error(format!(
                "incomplete data record: {} trailing values",
                self.pending.len()
            )));
        }

        let frequency = Frequency::from_f(self.frequencies, self.freq_unit);

        let z0 = match self.z0.len() {
            0 => vec![50.0; self.nports],
            1 => vec![self.z0[0]; self.nports],
            n if n == self.nports => self.z0,
            n => {
                return Err(TouchstoneError::Parse {
                    line: self.line,
                    message: format!("expected {} reference impedances, got {}", self.nports, n),
                })
            }
        };

        Ok(Touchstone {
            nports: self.nports,
            frequency,
            s: self.data,
            z0,
            comments: self.comments,
            format: self.format,
            param_type: self.param_type,
            is_v2: self.is_v2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_extension() {
        assert_eq!(Touchstone::parse_extension("s1p").unwrap(), 1);
        assert_eq!(Touchstone::parse_extension("s2p").unwrap(), 2);
        assert_eq!(Touchstone::parse_extension("S4P").unwrap(), 4);
        assert_eq!(Touchstone::parse_extension("s32p").unwrap(), 32);
        assert_eq!(Touchstone::parse_extension("ts").unwrap(), 0);
        assert!(Touchstone::parse_extension("sp").is_err());
        assert!(Touchstone::parse_extension("txt").is_err());
    }

    #[test]
    fn test_parse_option_line() {
        let (unit, format, z0, param_type) =
            Touchstone::parse_option_line("# GHz S RI R 50").unwrap();
        assert_eq!(unit, FrequencyUnit::GHz);
        assert_eq!(format, SParamFormat::RI);
        assert_eq!(z0, 50.0);
        assert_eq!(param_type, ParameterType::S);

        let (unit, format, z0, _) = Touchstone::parse_option_line("# mhz s ma r 75").unwrap();
        assert_eq!(unit, FrequencyUnit::MHz);
        assert_eq!(format, SParamFormat::MA);
        assert_eq!(z0, 75.0);

        assert!(Touchstone::parse_option_line("# GHz S RI R").is_err());
        assert!(Touchstone::parse_option_line("# GHz S XY").is_err());
    }

    #[test]
    fn test_option_line_defaults() {
        let (unit, format, z0, param_type) = Touchstone::parse_option_line("#").unwrap();
        assert_eq!(unit, FrequencyUnit::GHz);
        assert_eq!(format, SParamFormat::MA);
        assert_eq!(z0, 50.0);
        assert_eq!(param_type, ParameterType::S);
    }

    #[test]
    fn test_two_port_column_order() {
        let content = "! two port\n# Hz S RI R 50\n1e6 1 2 3 4 5 6 7 8\n";
        let ts = Touchstone::from_str(content, 2).unwrap();

        assert_eq!(ts.comments, vec![" two port".to_string()]);
        assert_eq!(ts.s[0][0][0], Complex64::new(1.0, 2.0));
        assert_eq!(ts.s[0][1][0], Complex64::new(3.0, 4.0));
        assert_eq!(ts.s[0][0][1], Complex64::new(5.0, 6.0));
        assert_eq!(ts.s[0][1][1], Complex64::new(7.0, 8.0));
    }

    #[test]
    fn test_records_split_across_lines() {
        let content = "# MHz S RI R 50\n\
                       1 0.1 0 0.2 0 0.3 0\n0.4 0 0.5 0 0.6 0 0.7 0 0.8 0 0.9 0\n\
                       2 0.1 0 0.2 0 0.3 0\n0.4 0 0.5 0 0.6 0 0.7 0 0.8 0 0.9 0\n";
        let ts = Touchstone::from_str(content, 3).unwrap();

        assert_eq!(ts.nfreq(), 2);
        assert_eq!(ts.frequency.f(), &[1e6, 2e6]);
        assert_relative_eq!(ts.s[1][2][1].re, 0.8);
    }

    #[test]
    fn test_db_format() {
        let content = "# GHz S DB R 50\n1.0 -6.020599913279624 180\n";
        let ts = Touchstone::from_str(content, 1).unwrap();

        assert_relative_eq!(ts.s[0][0][0].re, -0.5, epsilon = 1e-9);
        assert_relative_eq!(ts.s[0][0][0].im, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_v2_reference_continuation() {
        let content = "[Version] 2.0\n# Hz S RI R 50\n[Number of Ports] 3\n\
                       [Reference] 50 75\n100\n[Number of Frequencies] 1\n\
                       [Network Data]\n1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n[End]\n";
        let ts = Touchstone::from_str(content, 0).unwrap();

        assert!(ts.is_v2);
        assert_eq!(ts.nports, 3);
        assert_eq!(ts.z0, vec![50.0, 75.0, 100.0]);
        assert_eq!(ts.nfreq(), 1);
    }

    #[test]
    fn test_incomplete_record() {
        let content = "# Hz S RI R 50\n1 0.1 0.2 0.3\n";
        let err = Touchstone::from_str(content, 2).unwrap_err();
        assert!(matches!(err, TouchstoneError::Parse { .. }));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let content = "# Hz S RI R 50\n1 0.1 abc\n";
        match Touchstone::from_str(content, 1).unwrap_err() {
            TouchstoneError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
    }
}

//! SPICE netlist reader
//!
//! Reads back the subset of SPICE the synthesizer and the testbench emit.
//!
//! # Supported syntax
//!
//! ```text
//! * comment line
//! + continuation of the previous line
//! Rname n+ n- value
//! Vname n+ n- [DC val] [AC mag] | Vname n+ n- val
//! Aname %vd(c+ c-) %vd(o+ o-) model
//! Xname n1 .. nk subckt
//! .SUBCKT name pins..  /  .ENDS [name]
//! .model name xfer R_I=true table=[ f re im .. ]
//! .control .. .endc   (skipped)
//! .include / .title / .option  (ignored)
//! .END
//! ```
//!
//! Values support engineering suffixes: T, G, MEG, K, M, U, N, P, F
//! (case-insensitive).

use std::collections::HashMap;

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{map, opt};
use nom::number::complete::double;
use nom::IResult;
use nom::Parser;
use num_complex::Complex64;
use tracing::debug;

use crate::error::VerifyError;
use crate::spice::element::Element;

/// Tabulated transfer function of an `xfer` model
#[derive(Debug, Clone, PartialEq)]
pub struct XferTable {
    points: Vec<(f64, Complex64)>,
}

impl XferTable {
    /// `points` must be sorted by frequency
    pub fn new(points: Vec<(f64, Complex64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, Complex64)] {
        &self.points
    }

    /// Value at `f`, linear between samples and held flat outside the table
    pub fn eval(&self, f: f64) -> Complex64 {
        let pts = &self.points;
        match pts.len() {
            0 => Complex64::new(0.0, 0.0),
            _ if f <= pts[0].0 => pts[0].1,
            n if f >= pts[n - 1].0 => pts[n - 1].1,
            _ => {
                let k = pts.partition_point(|&(x, _)| x <= f);
                let (f0, v0) = pts[k - 1];
                let (f1, v1) = pts[k];
                if f == f0 {
                    return v0;
                }
                let t = (f - f0) / (f1 - f0);
                v0 + (v1 - v0) * t
            }
        }
    }
}

/// A `.SUBCKT` definition
#[derive(Debug, Clone, PartialEq)]
pub struct SubcktDef {
    pub name: String,
    pub pins: Vec<String>,
    pub elements: Vec<Element>,
    /// Models declared between `.SUBCKT` and `.ENDS`, visible to this
    /// definition only
    pub models: HashMap<String, XferTable>,
}

impl SubcktDef {
    /// Local model `name`, compared case-insensitively
    pub fn model(&self, name: &str) -> Option<&XferTable> {
        self.models.get(&name.to_lowercase())
    }
}

/// Parsed netlist: top-level elements, subcircuit definitions and the
/// models declared outside any subcircuit
#[derive(Debug, Clone, Default)]
pub struct Deck {
    pub elements: Vec<Element>,
    pub subckts: Vec<SubcktDef>,
    pub models: HashMap<String, XferTable>,
}

impl Deck {
    /// Parse netlist text; a leading title line is not expected
    pub fn parse(text: &str) -> Result<Self, VerifyError> {
        let mut deck = Deck::default();
        let mut current: Option<SubcktDef> = None;
        let mut in_control = false;

        for (line_num, line) in logical_lines(text) {
            let upper = line.to_uppercase();

            if in_control {
                if upper.starts_with(".ENDC") {
                    in_control = false;
                }
                continue;
            }

            let first = line.chars().next().unwrap_or(' ').to_ascii_uppercase();
            let element = match first {
                'R' => Some(parse_resistor(&line)),
                'V' => Some(parse_vsource(&line)),
                'A' => Some(parse_xfer(&line)),
                'X' => Some(parse_instance(&line)),
                '.' => None,
                other => {
                    return Err(VerifyError::deck(
                        line_num,
                        format!("unsupported element '{}': {}", other, line),
                    ))
                }
            };

            if let Some(element) = element {
                let element = element.map_err(|e| VerifyError::deck(line_num, e))?;
                match current.as_mut() {
                    Some(def) => def.elements.push(element),
                    None => deck.elements.push(element),
                }
                continue;
            }

            let keyword = upper.split_whitespace().next().unwrap_or("");
            match keyword {
                ".SUBCKT" => {
                    if current.is_some() {
                        return Err(VerifyError::deck(line_num, "nested .SUBCKT definition"));
                    }
                    let mut tokens = line.split_whitespace().skip(1);
                    let name = tokens
                        .next()
                        .ok_or_else(|| VerifyError::deck(line_num, ".SUBCKT without a name"))?;
                    current = Some(SubcktDef {
                        name: name.to_string(),
                        pins: tokens.map(str::to_string).collect(),
                        elements: Vec::new(),
                        models: HashMap::new(),
                    });
                }
                ".ENDS" => {
                    let def = current
                        .take()
                        .ok_or_else(|| VerifyError::deck(line_num, ".ENDS outside .SUBCKT"))?;
                    deck.subckts.push(def);
                }
                ".MODEL" => {
                    let (name, table) =
                        parse_model(&line).map_err(|e| VerifyError::deck(line_num, e))?;
                    let models = match current.as_mut() {
                        Some(def) => &mut def.models,
                        None => &mut deck.models,
                    };
                    models.insert(name.to_lowercase(), table);
                }
                ".CONTROL" => in_control = true,
                ".END" => break,
                _ => debug!(line = line_num, "ignoring {}", keyword),
            }
        }

        if let Some(def) = current {
            return Err(VerifyError::deck(
                0,
                format!("unterminated .SUBCKT {}", def.name),
            ));
        }

        Ok(deck)
    }

    /// Definition of subcircuit `name`, compared case-insensitively
    pub fn subckt(&self, name: &str) -> Option<&SubcktDef> {
        self.subckts
            .iter()
            .find(|def| def.name.eq_ignore_ascii_case(name))
    }

    /// Top-level model `name`, compared case-insensitively
    pub fn model(&self, name: &str) -> Option<&XferTable> {
        self.models.get(&name.to_lowercase())
    }
}

/// Subcircuit names and pin counts declared in `text`
///
/// The pin count includes the reference pin, so an N-port synthesized by this
/// crate reports `N + 1`.
pub fn scan_subcircuits(text: &str) -> Vec<(String, usize)> {
    text.lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let keyword = tokens.next()?;
            if !keyword.eq_ignore_ascii_case(".subckt") {
                return None;
            }
            let name = tokens.next()?;
            Some((name.to_string(), tokens.count()))
        })
        .filter(|(_, pins)| *pins > 1)
        .collect()
}

/// Non-empty, non-comment lines with `+` continuations folded in, paired
/// with the 1-based number of their first physical line
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (k, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('*') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            if let Some((_, last)) = lines.last_mut() {
                last.push(' ');
                last.push_str(rest.trim());
                continue;
            }
        }
        lines.push((k + 1, line.to_string()));
    }
    lines
}

// ---------------------------------------------------------------------------
// Engineering suffix value parser
// ---------------------------------------------------------------------------

/// Parse a numeric value with optional engineering suffix.
fn eng_value(input: &str) -> IResult<&str, f64> {
    let (rest, num) = double(input)?;
    let (rest, suffix) = opt(eng_suffix).parse(rest)?;
    Ok((rest, num * suffix.unwrap_or(1.0)))
}

fn eng_suffix(input: &str) -> IResult<&str, f64> {
    // MEG before M
    alt((
        map(tag_no_case("MEG"), |_: &str| 1e6),
        map(tag_no_case("T"), |_: &str| 1e12),
        map(tag_no_case("G"), |_: &str| 1e9),
        map(tag_no_case("K"), |_: &str| 1e3),
        map(tag_no_case("M"), |_: &str| 1e-3),
        map(tag_no_case("U"), |_: &str| 1e-6),
        map(tag_no_case("N"), |_: &str| 1e-9),
        map(tag_no_case("P"), |_: &str| 1e-12),
        map(tag_no_case("F"), |_: &str| 1e-15),
    ))
    .parse(input)
}

/// Parse a whole token as a value, rejecting trailing garbage
fn value_token(token: &str) -> Result<f64, String> {
    match eng_value(token) {
        Ok(("", v)) => Ok(v),
        _ => Err(format!("invalid number '{}'", token)),
    }
}

// ---------------------------------------------------------------------------
// Token parsers
// ---------------------------------------------------------------------------

fn node_id(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.').parse(input)
}

fn element_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace()).parse(input)
}

/// `%vd(a b)` or `%vd(a, b)`
fn vd_port(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, (_, _, _, _, pos, _, _, _, neg, _, _)) = (
        tag_no_case("%vd"),
        space0,
        char('('),
        space0,
        node_id,
        space0,
        opt(char(',')),
        space0,
        node_id,
        space0,
        char(')'),
    )
        .parse(input)?;
    Ok((rest, (pos, neg)))
}

/// Element names drop their prefix letter, which [`Element`] adds back
fn strip_prefix(name: &str) -> String {
    name.chars().skip(1).collect()
}

// ---------------------------------------------------------------------------
// Element lines
// ---------------------------------------------------------------------------

fn parse_resistor(line: &str) -> Result<Element, String> {
    let (rest, (name, _, pos, _, neg, _, value)) = (
        element_name,
        space1,
        node_id,
        space1,
        node_id,
        space1,
        eng_value,
    )
        .parse(line)
        .map_err(|_| "failed to parse resistor".to_string())?;
    if !rest.trim().is_empty() {
        return Err(format!("unexpected trailing text '{}'", rest.trim()));
    }
    if value == 0.0 {
        return Err(format!("resistor {} has zero resistance", name));
    }

    Ok(Element::Resistor {
        name: strip_prefix(name),
        pos: pos.to_string(),
        neg: neg.to_string(),
        value,
    })
}

/// `Vname n+ n- [DC val] [AC mag]` or a bare DC value
fn parse_vsource(line: &str) -> Result<Element, String> {
    let (rest, (name, _, pos, _, neg)) = (element_name, space1, node_id, space1, node_id)
        .parse(line)
        .map_err(|_| "failed to parse source name/nodes".to_string())?;

    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let mut dc = 0.0;
    let mut ac = None;
    let mut k = 0;
    while k < tokens.len() {
        let token = tokens[k];
        if token.eq_ignore_ascii_case("dc") || token.eq_ignore_ascii_case("ac") {
            let value = tokens
                .get(k + 1)
                .ok_or_else(|| format!("missing {} value", token))
                .and_then(|t| value_token(t))?;
            if token.eq_ignore_ascii_case("dc") {
                dc = value;
            } else {
                ac = Some(value);
            }
            k += 2;
        } else if k == 0 {
            dc = value_token(token)?;
            k += 1;
        } else {
            return Err(format!("unexpected source token '{}'", token));
        }
    }

    Ok(Element::VoltageSource {
        name: strip_prefix(name),
        pos: pos.to_string(),
        neg: neg.to_string(),
        dc,
        ac,
    })
}

fn parse_xfer(line: &str) -> Result<Element, String> {
    let (rest, (name, _, ctrl, _, out, _, model)) = (
        element_name,
        space1,
        vd_port,
        space1,
        vd_port,
        space1,
        element_name,
    )
        .parse(line)
        .map_err(|_| "failed to parse code-model source, expected A<name> %vd(..) %vd(..) <model>".to_string())?;
    if !rest.trim().is_empty() {
        return Err(format!("unexpected trailing text '{}'", rest.trim()));
    }

    Ok(Element::Xfer {
        name: strip_prefix(name),
        ctrl: (ctrl.0.to_string(), ctrl.1.to_string()),
        out: (out.0.to_string(), out.1.to_string()),
        model: model.to_string(),
    })
}

fn parse_instance(line: &str) -> Result<Element, String> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err("subcircuit instance needs nodes and a subcircuit name".to_string());
    }
    let subckt = tokens.pop().unwrap_or_default();
    let name = tokens.remove(0);

    Ok(Element::Instance {
        name: strip_prefix(name),
        nodes: tokens.iter().map(|t| t.to_string()).collect(),
        subckt: subckt.to_string(),
    })
}

// ---------------------------------------------------------------------------
// .model
// ---------------------------------------------------------------------------

fn parse_model(line: &str) -> Result<(String, XferTable), String> {
    // give brackets and '=' their own tokens
    let spaced = line
        .replace('[', " [ ")
        .replace(']', " ] ")
        .replace('=', " = ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();

    let name = tokens.get(1).ok_or("model without a name")?;
    let kind = tokens.get(2).ok_or("model without a type")?;
    if !kind.eq_ignore_ascii_case("xfer") {
        return Err(format!("unsupported model type '{}'", kind));
    }

    let mut real_imag = false;
    let mut table: Option<Vec<f64>> = None;
    let mut k = 3;
    while k < tokens.len() {
        let key = tokens[k];
        if tokens.get(k + 1) != Some(&"=") {
            return Err(format!("expected '=' after '{}'", key));
        }
        if key.eq_ignore_ascii_case("table") {
            if tokens.get(k + 2) != Some(&"[") {
                return Err("table must start with '['".to_string());
            }
            let end = tokens[k + 3..]
                .iter()
                .position(|&t| t == "]")
                .map(|p| k + 3 + p)
                .ok_or("table is missing its closing ']'")?;
            table = Some(
                tokens[k + 3..end]
                    .iter()
                    .map(|t| value_token(t))
                    .collect::<Result<_, _>>()?,
            );
            k = end + 1;
        } else {
            let value = tokens.get(k + 2).ok_or(format!("missing value for '{}'", key))?;
            if key.eq_ignore_ascii_case("r_i") {
                real_imag = value.eq_ignore_ascii_case("true");
            } else {
                debug!(model = %name, "ignoring model parameter {}", key);
            }
            k += 3;
        }
    }

    if !real_imag {
        return Err(format!("model {}: only R_I=true tables are supported", name));
    }
    let values = table.ok_or(format!("model {} has no table", name))?;
    if values.len() % 3 != 0 {
        return Err(format!(
            "model {}: table has {} values, expected frequency/real/imaginary triples",
            name,
            values.len()
        ));
    }

    let points: Vec<(f64, Complex64)> = values
        .chunks_exact(3)
        .map(|c| (c[0], Complex64::new(c[1], c[2])))
        .collect();
    if points.windows(2).any(|w| w[1].0 <= w[0].0) {
        return Err(format!("model {}: table frequencies must be ascending", name));
    }

    Ok((name.to_string(), XferTable::new(points)))
}

//! Legacy `.dpfl` setup files
//!
//! Four sections, each a header, a dashed rule and Python-style literals:
//!
//! ```text
//! Structure:
//! -------------------
//! 1
//! {1: 'Story(10000.0, 3.0, 0.35, 0.35, 25000000000.0, "Engastado-Engastado")'}
//!
//! TLCD:
//! -------------------
//! ('TLCD Simples', 0.3, 10.0, 1.0)
//!
//! Excitation:
//! -------------------
//! ('Seno', 5.0, 45.55, False, 3.0, 5.0)
//!
//! Configurations:
//! -------------------
//! ('Método das Diferenças Finitas', 0.001, 0.0, 0.0, 0.02, 998.2071, 1.003e-06, 9.807)
//! ```
//!
//! Only literals are understood (numbers, strings, booleans, `None`, tuples,
//! lists and dicts). Nothing is ever evaluated.

use std::io::{BufRead, Write};
use std::iter::Peekable;
use std::str::CharIndices;

use crate::analysis::{Configurations, FluidProperties, IntegrationMethod};
use crate::elements::{Story, Support, Tlcd, TlcdKind};
use crate::error::{DynaError, DynaResult};
use crate::loads::{Excitation, SineWave};
use crate::model::DynamicModel;

const SECTIONS: [&str; 4] = ["Structure", "TLCD", "Excitation", "Configurations"];
const RULE: &str = "-------------------";
const SINE_LABEL: &str = "Seno";

/// A parsed literal
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    None,
    Seq(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

fn parse_error(line: usize, message: impl Into<String>) -> DynaError {
    DynaError::Parse {
        line,
        message: message.into(),
    }
}

struct LiteralParser<'s> {
    text: &'s str,
    chars: Peekable<CharIndices<'s>>,
    line: usize,
}

impl<'s> LiteralParser<'s> {
    fn new(text: &'s str, line: usize) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
            line,
        }
    }

    /// Parse exactly one literal spanning the whole text
    fn parse_all(mut self) -> DynaResult<Literal> {
        let value = self.value()?;
        self.skip_ws();
        match self.chars.peek().map(|&(pos, _)| pos) {
            None => Ok(value),
            Some(pos) => Err(self.error(format!(
                "unexpected trailing input '{}'",
                &self.text[pos..]
            ))),
        }
    }

    fn error(&self, message: impl Into<String>) -> DynaError {
        parse_error(self.line, message)
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, wanted: char) -> DynaResult<()> {
        self.skip_ws();
        match self.chars.next() {
            Some((_, c)) if c == wanted => Ok(()),
            Some((_, c)) => Err(self.error(format!("expected '{}', found '{}'", wanted, c))),
            None => Err(self.error(format!("expected '{}', found end of line", wanted))),
        }
    }

    fn value(&mut self) -> DynaResult<Literal> {
        self.skip_ws();
        let (start, c) = match self.chars.peek().copied() {
            Some(next) => next,
            None => return Err(self.error("expected a value, found end of line")),
        };
        match c {
            '(' => self.sequence('(', ')'),
            '[' => self.sequence('[', ']'),
            '{' => self.dict(),
            '\'' | '"' => self.string(),
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(start),
            c if c.is_alphabetic() => self.word(start),
            other => Err(self.error(format!("unexpected character '{}'", other))),
        }
    }

    fn sequence(&mut self, open: char, close: char) -> DynaResult<Literal> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.next_if(|&(_, c)| c == close).is_some() {
                return Ok(Literal::Seq(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, c)) if c == close => return Ok(Literal::Seq(items)),
                _ => return Err(self.error(format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn dict(&mut self) -> DynaResult<Literal> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.next_if(|&(_, c)| c == '}').is_some() {
                return Ok(Literal::Dict(entries));
            }
            let key = self.value()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, '}')) => return Ok(Literal::Dict(entries)),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn string(&mut self) -> DynaResult<Literal> {
        let quote = match self.chars.next() {
            Some((_, q)) => q,
            None => return Err(self.error("expected a string")),
        };
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(Literal::Str(out)),
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn number(&mut self, start: usize) -> DynaResult<Literal> {
        let mut end = start;
        while let Some((pos, c)) = self
            .chars
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'))
        {
            end = pos + c.len_utf8();
        }
        let token = &self.text[start..end];
        token
            .parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| self.error(format!("invalid number '{}'", token)))
    }

    fn word(&mut self, start: usize) -> DynaResult<Literal> {
        let mut end = start;
        while let Some((pos, c)) = self.chars.next_if(|&(_, c)| c.is_alphanumeric() || c == '_') {
            end = pos + c.len_utf8();
        }
        match &self.text[start..end] {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            "inf" => Ok(Literal::Number(f64::INFINITY)),
            other => Err(self.error(format!(
                "'{}' is not a literal; expressions are not evaluated",
                other
            ))),
        }
    }
}

/// Typed access to the fields of a parsed tuple
struct Fields<'a> {
    items: &'a [Literal],
    line: usize,
    record: &'static str,
}

impl<'a> Fields<'a> {
    fn new(value: &'a Literal, line: usize, record: &'static str, min: usize) -> DynaResult<Self> {
        let items = match value {
            Literal::Seq(items) => items.as_slice(),
            _ => return Err(parse_error(line, format!("{} must be a tuple", record))),
        };
        if items.len() < min {
            return Err(parse_error(
                line,
                format!("{} needs at least {} fields, found {}", record, min, items.len()),
            ));
        }
        Ok(Self { items, line, record })
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn error(&self, index: usize, expected: &str) -> DynaError {
        parse_error(
            self.line,
            format!("{} field {} must be {}", self.record, index + 1, expected),
        )
    }

    fn number(&self, index: usize) -> DynaResult<f64> {
        match self.items.get(index) {
            Some(Literal::Number(v)) => Ok(*v),
            Some(Literal::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(self.error(index, "a number")),
        }
    }

    fn string(&self, index: usize) -> DynaResult<&'a str> {
        match self.items.get(index) {
            Some(Literal::Str(s)) => Ok(s.as_str()),
            _ => Err(self.error(index, "a string")),
        }
    }

    fn flag(&self, index: usize) -> DynaResult<bool> {
        match self.items.get(index) {
            Some(Literal::Bool(b)) => Ok(*b),
            Some(Literal::Number(v)) => Ok(*v != 0.0),
            _ => Err(self.error(index, "a boolean")),
        }
    }

    fn count(&self, index: usize) -> DynaResult<usize> {
        let value = self.number(index)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(self.error(index, "a non-negative integer"));
        }
        Ok(value as usize)
    }
}

/// Value lines of one section, with their 1-based line numbers
type Section = Vec<(usize, String)>;

fn collect_lines<R: BufRead>(reader: R) -> DynaResult<Vec<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|v| (i + 1, v)).map_err(DynaError::from))
        .collect()
}

fn split_sections(lines: &[(usize, String)]) -> DynaResult<[Section; 4]> {
    let mut sections: [Section; 4] = Default::default();
    let mut current: Option<usize> = None;

    for (line_no, raw) in lines {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().all(|c| c == '-') {
            continue;
        }
        if let Some(header) = trimmed.strip_suffix(':') {
            if let Some(index) = SECTIONS.iter().position(|s| *s == header.trim()) {
                current = Some(index);
                continue;
            }
        }
        match current {
            Some(index) => sections[index].push((*line_no, trimmed.to_string())),
            None => return Err(parse_error(*line_no, "value outside of any section")),
        }
    }

    for (name, section) in SECTIONS.iter().zip(&sections) {
        if section.is_empty() && *name != "TLCD" {
            let last = lines.last().map_or(0, |(ln, _)| *ln);
            return Err(parse_error(last, format!("missing {} section", name)));
        }
    }
    Ok(sections)
}

fn parse_story(text: &str, line: usize) -> DynaResult<Story> {
    let args = text
        .trim()
        .strip_prefix("Story")
        .ok_or_else(|| parse_error(line, format!("expected a Story(...) record, found '{}'", text)))?;
    let value = LiteralParser::new(args, line).parse_all()?;
    let fields = Fields::new(&value, line, "Story", 5)?;
    let support = if fields.len() > 5 {
        Support::from_label(fields.string(5)?)?
    } else {
        Support::default()
    };
    Ok(Story::new(
        fields.number(0)?,
        fields.number(1)?,
        fields.number(2)?,
        fields.number(3)?,
        fields.number(4)?,
        support,
    ))
}

fn parse_structure(section: &Section) -> DynaResult<Vec<Story>> {
    let (count_line, count_text) = &section[0];
    let expected = count_text
        .parse::<usize>()
        .map_err(|_| parse_error(*count_line, "story count must be an integer"))?;

    let (dict_line, dict_text) = section
        .get(1)
        .ok_or_else(|| parse_error(*count_line, "missing story dictionary"))?;
    let entries = match LiteralParser::new(dict_text, *dict_line).parse_all()? {
        Literal::Dict(entries) => entries,
        _ => return Err(parse_error(*dict_line, "stories must be a dictionary")),
    };
    if entries.len() != expected {
        return Err(parse_error(
            *dict_line,
            format!("{} stories declared but {} given", expected, entries.len()),
        ));
    }

    let mut numbered = Vec::with_capacity(entries.len());
    for (key, value) in &entries {
        let number = match key {
            Literal::Number(n) if *n >= 1.0 && n.fract() == 0.0 => *n as usize,
            _ => return Err(parse_error(*dict_line, "story keys must be positive integers")),
        };
        let call = match value {
            Literal::Str(call) => call,
            _ => return Err(parse_error(*dict_line, "story values must be strings")),
        };
        numbered.push((number, parse_story(call, *dict_line)?));
    }
    numbered.sort_by_key(|(number, _)| *number);
    if numbered.iter().enumerate().any(|(i, (n, _))| *n != i + 1) {
        return Err(parse_error(*dict_line, "stories must be numbered 1..n"));
    }
    Ok(numbered.into_iter().map(|(_, story)| story).collect())
}

/// `(type, D, width, waterHeight[, gasHeight, gasPressure[, amount[, contraction]]])`
fn parse_tlcd(section: &Section) -> DynaResult<Option<Tlcd>> {
    let (line, text) = match section.first() {
        Some((line, text)) => (*line, text),
        None => return Ok(None),
    };
    let value = LiteralParser::new(text, line).parse_all()?;
    if value == Literal::None {
        return Ok(None);
    }
    let fields = Fields::new(&value, line, "TLCD", 4)?;

    let mut kind = TlcdKind::from_label(fields.string(0)?)?;
    if let TlcdKind::Pressurized {
        gas_height,
        gas_pressure,
    } = &mut kind
    {
        match fields.len() {
            5 => {
                return Err(parse_error(
                    line,
                    "pressurized TLCD needs both gas height and gas pressure",
                ))
            }
            len if len > 5 => {
                *gas_height = fields.number(4)?;
                *gas_pressure = fields.number(5)?;
            }
            _ => {}
        }
    }
    let mut tlcd = Tlcd {
        kind,
        ..Tlcd::basic(fields.number(1)?, fields.number(2)?, fields.number(3)?)
    };
    if fields.len() > 6 {
        tlcd.amount = fields.count(6)?;
    }
    if fields.len() > 7 {
        tlcd.contraction = fields.number(7)?;
    }
    Ok(Some(tlcd))
}

/// `('Seno', amplitude, frequency, relative, excitationDuration, analysisDuration)`
fn parse_excitation(section: &Section) -> DynaResult<Excitation> {
    let (line, text) = &section[0];
    let value = LiteralParser::new(text, *line).parse_all()?;
    let fields = Fields::new(&value, *line, "Excitation", 6)?;
    let label = fields.string(0)?;
    if !label.eq_ignore_ascii_case(SINE_LABEL) && !label.eq_ignore_ascii_case("sine") {
        return Err(parse_error(
            *line,
            format!("unsupported excitation type '{}'", label),
        ));
    }
    Ok(Excitation::Sine(SineWave {
        amplitude: fields.number(1)?,
        frequency: fields.number(2)?,
        relative_frequency: fields.flag(3)?,
        excitation_duration: fields.number(4)?,
        analysis_duration: fields.number(5)?,
    }))
}

/// `(method, dt, x0, v0, ratio, rho, nu, g[, roughness, dmfPoints, dmfFactor, nonLinear])`
fn parse_configurations(section: &Section) -> DynaResult<Configurations> {
    let (line, text) = &section[0];
    let value = LiteralParser::new(text, *line).parse_all()?;
    let fields = Fields::new(&value, *line, "Configurations", 8)?;
    let defaults = Configurations::default();

    let mut config = Configurations {
        method: IntegrationMethod::from_label(fields.string(0)?)?,
        time_step: fields.number(1)?,
        initial_displacement: fields.number(2)?,
        initial_velocity: fields.number(3)?,
        damping_ratio: fields.number(4)?,
        fluid: FluidProperties {
            specific_mass: fields.number(5)?,
            kinematic_viscosity: fields.number(6)?,
            gravity: fields.number(7)?,
            pipe_roughness: defaults.fluid.pipe_roughness,
        },
        ..defaults
    };
    if fields.len() > 8 {
        config.fluid.pipe_roughness = fields.number(8)?;
    }
    if fields.len() > 9 {
        config.dmf_points = fields.count(9)?;
    }
    if fields.len() > 10 {
        config.dmf_upper_limit_factor = fields.number(10)?;
    }
    if fields.len() > 11 {
        config.nonlinear_analysis = fields.flag(11)?;
    }
    Ok(config)
}

/// Read a legacy setup
pub fn read<R: BufRead>(reader: R) -> DynaResult<DynamicModel> {
    let lines = collect_lines(reader)?;
    let [structure, tlcd, excitation, configurations] = split_sections(&lines)?;

    let model = DynamicModel {
        stories: parse_structure(&structure)?,
        tlcd: parse_tlcd(&tlcd)?,
        excitation: parse_excitation(&excitation)?,
        configurations: parse_configurations(&configurations)?,
    };
    model.validate()?;
    Ok(model)
}

fn quoted(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Write a setup in the legacy layout.
///
/// Only sine excitations have a legacy representation.
pub fn write<W: Write>(mut writer: W, model: &DynamicModel) -> DynaResult<()> {
    let sine = match &model.excitation {
        Excitation::Sine(sine) => sine,
        Excitation::General(_) => {
            return Err(DynaError::InvalidInput(
                "the legacy layout only stores sine excitations".to_string(),
            ))
        }
    };

    writeln!(writer, "Structure: \n{}", RULE)?;
    writeln!(writer, "{}", model.stories.len())?;
    let stories: Vec<String> = model
        .stories
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}: 'Story({:?}, {:?}, {:?}, {:?}, {:?}, \"{}\")'",
                i + 1,
                s.mass,
                s.height,
                s.width,
                s.depth,
                s.elastic_modulus,
                s.support.legacy_label()
            )
        })
        .collect();
    writeln!(writer, "{{{}}}", stories.join(", "))?;

    writeln!(writer, "\nTLCD: \n{}", RULE)?;
    match &model.tlcd {
        None => writeln!(writer, "None")?,
        Some(tlcd) => {
            let (gas_height, gas_pressure) = match tlcd.kind {
                TlcdKind::Pressurized {
                    gas_height,
                    gas_pressure,
                } => (gas_height, gas_pressure),
                TlcdKind::Basic => (0.0, 0.0),
            };
            writeln!(
                writer,
                "({}, {:?}, {:?}, {:?}, {:?}, {:?}, {}, {:?})",
                quoted(tlcd.kind.legacy_label()),
                tlcd.diameter,
                tlcd.width,
                tlcd.water_height,
                gas_height,
                gas_pressure,
                tlcd.amount,
                tlcd.contraction
            )?;
        }
    }

    writeln!(writer, "\nExcitation: \n{}", RULE)?;
    writeln!(
        writer,
        "({}, {:?}, {:?}, {}, {:?}, {:?})",
        quoted(SINE_LABEL),
        sine.amplitude,
        sine.frequency,
        py_bool(sine.relative_frequency),
        sine.excitation_duration,
        sine.analysis_duration
    )?;

    let c = &model.configurations;
    writeln!(writer, "\nConfigurations: \n{}", RULE)?;
    writeln!(
        writer,
        "({}, {:?}, {:?}, {:?}, {:?}, {:?}, {:?}, {:?}, {:?}, {}, {:?}, {})",
        quoted(c.method.legacy_label()),
        c.time_step,
        c.initial_displacement,
        c.initial_velocity,
        c.damping_ratio,
        c.fluid.specific_mass,
        c.fluid.kinematic_viscosity,
        c.fluid.gravity,
        c.fluid.pipe_roughness,
        c.dmf_points,
        c.dmf_upper_limit_factor,
        py_bool(c.nonlinear_analysis)
    )?;
    Ok(())
}

//! Snapshot text codec
//!
//! A recording is a `HEADER:` block carrying the run's flag line, closed by `$`,
//! followed by snapshots. Every snapshot is a run of `!`-delimited sections closed
//! by `$`:
//!
//! ```text
//! !
//! ROBOTS:
//! !
//! 3.5 7.25 0.1 12.5
//! !
//! LIGHTS:
//! !
//! 517 1
//! !
//! $
//! ```
//!
//! Sections may be missing (GOALS is only written into the first snapshot). Lights
//! are sparse: indices that are not listed load as zero.

use crate::core::config::SimConfig;
use crate::core::error::{PushError, Result};
use crate::geometry::Shape;
use crate::swarm::goals::{Goal, GoalBuckets};
use crate::swarm::physics::{Physics, Transform};
use crate::swarm::world::World;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const SECTION: &str = "!";
const END: &str = "$";
const HEADER: &str = "HEADER:";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotState {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub charge: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxState {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub inside: bool,
}

/// One recorded instant of the world
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub goals: Option<Vec<Goal>>,
    pub robots: Vec<RobotState>,
    pub boxes: Vec<BoxState>,
    /// Non-zero lights as `(index, intensity)`
    pub lights: Vec<(usize, f64)>,
}

impl Snapshot {
    pub fn capture<P: Physics>(world: &World<P>, with_goals: bool) -> Self {
        let robots = world
            .robots
            .iter()
            .map(|r| {
                let t = world.physics.transform(r.body);
                RobotState {
                    x: t.x,
                    y: t.y,
                    angle: t.angle,
                    charge: r.charge,
                }
            })
            .collect();
        let boxes = world
            .boxes
            .iter()
            .map(|b| {
                let t = world.physics.transform(b.body);
                BoxState {
                    x: t.x,
                    y: t.y,
                    angle: t.angle,
                    inside: b.inside,
                }
            })
            .collect();

        Snapshot {
            goals: with_goals.then(|| world.goals.goals().to_vec()),
            robots,
            boxes,
            lights: world.field.active(),
        }
    }

    /// Overwrite the world with this snapshot. Body counts must match exactly.
    pub fn apply_to<P: Physics>(&self, world: &mut World<P>) -> Result<()> {
        if self.robots.len() != world.robots.len() {
            return Err(PushError::ReplayMismatch {
                what: "robots",
                expected: world.robots.len(),
                found: self.robots.len(),
            });
        }
        if self.boxes.len() != world.boxes.len() {
            return Err(PushError::ReplayMismatch {
                what: "boxes",
                expected: world.boxes.len(),
                found: self.boxes.len(),
            });
        }

        for (robot, state) in world.robots.iter_mut().zip(&self.robots) {
            world
                .physics
                .set_transform(robot.body, Transform::new(state.x, state.y, state.angle));
            robot.charge = state.charge;
        }
        for (pushed, state) in world.boxes.iter_mut().zip(&self.boxes) {
            world
                .physics
                .set_transform(pushed.body, Transform::new(state.x, state.y, state.angle));
            pushed.inside = state.inside;
        }
        world.field.load_sparse(&self.lights);
        if let Some(goals) = &self.goals {
            world.goals = GoalBuckets::new(goals.clone());
        }
        Ok(())
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(goals) = &self.goals {
            section(&mut out, "GOALS", goals, |out, g| {
                writeln!(out, "{} {} {} {}", g.x, g.y, g.size, g.shape.index())
            });
        }
        section(&mut out, "ROBOTS", &self.robots, |out, r| {
            writeln!(out, "{} {} {} {}", r.x, r.y, r.angle, r.charge)
        });
        section(&mut out, "BOXES", &self.boxes, |out, b| {
            writeln!(out, "{} {} {} {}", b.x, b.y, b.angle, u8::from(b.inside))
        });
        section(&mut out, "LIGHTS", &self.lights, |out, (i, v)| writeln!(out, "{} {}", i, v));
        out.push_str(SECTION);
        out.push('\n');
        out.push_str(END);
        out.push('\n');
        out
    }
}

fn section<T>(
    out: &mut String,
    name: &str,
    items: &[T],
    mut line: impl FnMut(&mut String, &T) -> std::fmt::Result,
) {
    out.push_str(SECTION);
    out.push('\n');
    out.push_str(name);
    out.push_str(":\n");
    out.push_str(SECTION);
    out.push('\n');
    for item in items {
        // writing into a String cannot fail
        let _ = line(out, item);
    }
}

/// Append-only recorder
pub struct SnapshotWriter<W: Write> {
    inner: W,
    written: usize,
}

/// File-backed recorder, as attached to a live `Simulation`
pub type FileRecorder = SnapshotWriter<Box<dyn Write>>;

impl SnapshotWriter<Box<dyn Write>> {
    pub fn create(path: &Path, config: &SimConfig) -> Result<Self> {
        let file = File::create(path)?;
        info!("💾 [Snapshot] Recording to {}", path.display());
        Self::new(Box::new(BufWriter::new(file)), config)
    }
}

impl<W: Write> SnapshotWriter<W> {
    /// Wrap `inner` and write the header block.
    pub fn new(mut inner: W, config: &SimConfig) -> Result<Self> {
        writeln!(inner, "{}", HEADER)?;
        writeln!(inner, "{}", config.header_flags())?;
        writeln!(inner, "{}", END)?;
        Ok(SnapshotWriter { inner, written: 0 })
    }

    pub fn append(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.inner.write_all(snapshot.encode().as_bytes())?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// A parsed recording: the header flags (if any) and every snapshot in order.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    pub header: Option<String>,
    pub snapshots: Vec<Snapshot>,
}

impl Recording {
    /// Default configuration overlaid with the recorded header flags.
    pub fn config(&self) -> Result<SimConfig> {
        let mut config = SimConfig::default();
        if let Some(flags) = &self.header {
            config.apply_header_flags(flags)?;
        }
        Ok(config)
    }
}

/// Line-oriented snapshot parser
pub struct SnapshotReader<'a> {
    lines: std::iter::Peekable<std::iter::Enumerate<std::str::Lines<'a>>>,
    /// 1-based number of the last non-blank line handed out
    last_line: usize,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(text: &'a str) -> Self {
        SnapshotReader {
            lines: text.lines().enumerate().peekable(),
            last_line: 0,
        }
    }

    pub fn open(path: &Path) -> Result<Recording> {
        let text = std::fs::read_to_string(path)?;
        let recording = SnapshotReader::new(&text).read_all()?;
        info!(
            "📂 [Snapshot] Loaded {} snapshots from {}",
            recording.snapshots.len(),
            path.display()
        );
        Ok(recording)
    }

    pub fn read_all(mut self) -> Result<Recording> {
        let header = self.read_header()?;
        let mut snapshots = Vec::new();
        while let Some(snapshot) = self.next_snapshot()? {
            snapshots.push(snapshot);
        }
        Ok(Recording { header, snapshots })
    }

    /// Next non-blank line, trimmed, with its 1-based line number.
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for (i, line) in self.lines.by_ref() {
            let line = line.trim();
            if !line.is_empty() {
                self.last_line = i + 1;
                return Some((i + 1, line));
            }
        }
        None
    }

    fn peek_line(&mut self) -> Option<&'a str> {
        while let Some(&(_, line)) = self.lines.peek() {
            if line.trim().is_empty() {
                self.lines.next();
            } else {
                return Some(line.trim());
            }
        }
        None
    }

    fn read_header(&mut self) -> Result<Option<String>> {
        match self.peek_line() {
            Some(line) if line.starts_with(HEADER) => {}
            _ => return Ok(None),
        }

        let mut flags = Vec::new();
        while let Some((n, line)) = self.next_line() {
            if line == END {
                return Ok(Some(flags.join(" ")));
            }
            if line == SECTION {
                return Err(malformed(n, "header block is not closed by '$'"));
            }
            let rest = line.strip_prefix(HEADER).unwrap_or(line).trim();
            if !rest.is_empty() {
                flags.push(rest.to_string());
            }
        }
        Err(malformed(self.last_line, "file ends inside the header block"))
    }

    /// Parse one `!`...`$` record, or `None` at end of input.
    pub fn next_snapshot(&mut self) -> Result<Option<Snapshot>> {
        let Some((n, first)) = self.next_line() else {
            return Ok(None);
        };
        if first != SECTION {
            return Err(malformed(n, format!("expected '{}' to open a snapshot, found {:?}", SECTION, first)));
        }

        let mut snapshot = Snapshot::default();
        loop {
            let Some((n, line)) = self.next_line() else {
                return Err(malformed(self.last_line, "snapshot is not closed by '$'"));
            };
            if line == END {
                return Ok(Some(snapshot));
            }

            let name = line
                .strip_suffix(':')
                .ok_or_else(|| malformed(n, format!("expected a section name, found {:?}", line)))?;
            match self.next_line() {
                Some((_, SECTION)) => {}
                Some((m, other)) => {
                    return Err(malformed(m, format!("expected '!' after {}:, found {:?}", name, other)))
                }
                None => return Err(malformed(n, "file ends inside a section header")),
            }

            let body = self.section_body()?;
            match name {
                "GOALS" => snapshot.goals = Some(parse_rows(&body, parse_goal)?),
                "ROBOTS" => snapshot.robots = parse_rows(&body, parse_robot)?,
                "BOXES" => snapshot.boxes = parse_rows(&body, parse_box)?,
                "LIGHTS" => snapshot.lights = parse_rows(&body, parse_light)?,
                other => return Err(malformed(n, format!("unknown section {:?}", other))),
            }
        }
    }

    /// Data lines up to and including the `!` that closes the section.
    fn section_body(&mut self) -> Result<Vec<(usize, &'a str)>> {
        let mut body = Vec::new();
        while let Some((n, line)) = self.next_line() {
            if line == SECTION {
                return Ok(body);
            }
            if line == END {
                return Err(malformed(n, "'$' inside a section"));
            }
            body.push((n, line));
        }
        Err(malformed(self.last_line, "file ends inside a section"))
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> PushError {
    PushError::MalformedSnapshot {
        line,
        reason: reason.into(),
    }
}

fn parse_rows<T>(body: &[(usize, &str)], parse: fn(&[&str]) -> Option<T>) -> Result<Vec<T>> {
    body.iter()
        .map(|&(n, line)| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            parse(&fields).ok_or_else(|| malformed(n, format!("bad row {:?}", line)))
        })
        .collect()
}

fn numbers<const N: usize>(fields: &[&str]) -> Option<[f64; N]> {
    if fields.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field.parse().ok()?;
    }
    Some(out)
}

fn parse_goal(fields: &[&str]) -> Option<Goal> {
    let [x, y, size] = numbers::<3>(fields.get(..3)?)?;
    if fields.len() != 4 {
        return None;
    }
    let shape = Shape::from_index(fields[3].parse().ok()?)?;
    Some(Goal::new(x, y, size, shape))
}

fn parse_robot(fields: &[&str]) -> Option<RobotState> {
    let [x, y, angle, charge] = numbers::<4>(fields)?;
    Some(RobotState { x, y, angle, charge })
}

fn parse_box(fields: &[&str]) -> Option<BoxState> {
    let [x, y, angle, inside] = numbers::<4>(fields)?;
    Some(BoxState {
        x,
        y,
        angle,
        inside: inside != 0.0,
    })
}

fn parse_light(fields: &[&str]) -> Option<(usize, f64)> {
    match fields {
        [index, value] => Some((index.parse().ok()?, value.parse().ok()?)),
        _ => None,
    }
}

//! Handling of machines whose results were parsed before.
//!
//! Parsing never mixes old and new results: if any output directory of a machine
//! exists, an [Operator] decides whether the old results are replaced, the run is
//! aborted or the run waits until the old results have been moved away.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use log::{info, warn};

use crate::config::CollisionPolicy;
use crate::layout::MachineId;
use crate::Error;

/// Answer to an output collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Remove the machine's old results
    Overwrite,
    /// Stop without touching anything
    Abort,
    /// Block until the old results are gone
    Wait,
}

/// Decides what happens to existing results
pub trait Operator {
    fn choose(&mut self, machine: &MachineId, existing: &[PathBuf]) -> anyhow::Result<Resolution>;

    /// Return once none of `dirs` exists anymore
    fn wait_until_cleared(&mut self, machine: &MachineId, dirs: &[PathBuf]) -> anyhow::Result<()>;
}

/// Asks the person running the tool
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> anyhow::Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while waiting for an answer");
        }
        Ok(line.trim().to_owned())
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn choose(&mut self, machine: &MachineId, existing: &[PathBuf]) -> anyhow::Result<Resolution> {
        writeln!(
            self.output,
            "\nThere are already parsed results present for machine-{machine}:"
        )?;
        for dir in existing {
            writeln!(self.output, "  {}", dir.display())?;
        }
        loop {
            writeln!(self.output, "\nPlease select one of the following options:")?;
            writeln!(self.output, "1 - Replace old parsed results with new ones")?;
            writeln!(
                self.output,
                "2 - Exit parsing programme to move old parsed results and retry"
            )?;
            writeln!(
                self.output,
                "3 - Make parsing programme wait until old results have been moved"
            )?;
            write!(self.output, "Enter option: ")?;

            match self.read_line()?.as_str() {
                "1" => return Ok(Resolution::Overwrite),
                "2" => return Ok(Resolution::Abort),
                "3" => return Ok(Resolution::Wait),
                other => writeln!(
                    self.output,
                    "Incorrect value {other:?}, please select 1, 2 or 3"
                )?,
            }
        }
    }

    fn wait_until_cleared(&mut self, machine: &MachineId, dirs: &[PathBuf]) -> anyhow::Result<()> {
        while dirs.iter().any(|d| d.exists()) {
            write!(
                self.output,
                "Move the old results of machine-{machine} away, then press enter to continue: "
            )?;
            self.read_line()?;
        }
        Ok(())
    }
}

/// Answers every collision the same way, waits by polling the filesystem
#[derive(Debug, Clone)]
pub struct PolicyOperator {
    pub resolution: Resolution,
    pub poll_interval: Duration,
}

impl PolicyOperator {
    pub fn new(resolution: Resolution, poll_interval: Duration) -> Self {
        Self {
            resolution,
            poll_interval,
        }
    }
}

impl Operator for PolicyOperator {
    fn choose(&mut self, machine: &MachineId, existing: &[PathBuf]) -> anyhow::Result<Resolution> {
        info!(
            "machine-{machine} has parsed results in {existing:?}, resolving as {:?}",
            self.resolution
        );
        Ok(self.resolution)
    }

    fn wait_until_cleared(&mut self, machine: &MachineId, dirs: &[PathBuf]) -> anyhow::Result<()> {
        while dirs.iter().any(|d| d.exists()) {
            info!(
                "waiting for the old results of machine-{machine} to be moved, checking again in {:?}",
                self.poll_interval
            );
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }
}

/// The operator implementing a configured [CollisionPolicy]
pub fn operator_for(policy: CollisionPolicy, poll_interval: Duration) -> Box<dyn Operator> {
    let fixed = |r| Box::new(PolicyOperator::new(r, poll_interval)) as Box<dyn Operator>;
    match policy {
        CollisionPolicy::Prompt => Box::new(TerminalOperator::stdio()),
        CollisionPolicy::Overwrite => fixed(Resolution::Overwrite),
        CollisionPolicy::Abort => fixed(Resolution::Abort),
        CollisionPolicy::Wait => fixed(Resolution::Wait),
    }
}

/// Outcome of [prepare_output_dirs]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    /// All output directories exist and are empty
    Ready,
    /// The operator chose to stop; nothing was touched
    Aborted,
}

fn create_all(dirs: &[PathBuf]) -> anyhow::Result<()> {
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    Ok(())
}

/// Make sure the output directories of a machine exist and hold no old results
///
/// Overwriting removes `machine_dir`, the directory holding all of the machine's
/// results for one tool, never anything above it.
pub fn prepare_output_dirs(
    machine: &MachineId,
    machine_dir: &Path,
    dirs: &[PathBuf],
    operator: &mut dyn Operator,
) -> anyhow::Result<Prepared> {
    let existing: Vec<PathBuf> = dirs.iter().filter(|d| d.exists()).cloned().collect();
    if existing.is_empty() {
        create_all(dirs)?;
        return Ok(Prepared::Ready);
    }

    match operator.choose(machine, &existing)? {
        Resolution::Overwrite => {
            warn!("removing old results in {machine_dir:?}");
            fs::remove_dir_all(machine_dir)
                .with_context(|| format!("could not remove old results in {machine_dir:?}"))?;
        }
        Resolution::Abort => {
            info!("leaving the old results of machine-{machine} in place, stopping");
            return Ok(Prepared::Aborted);
        }
        Resolution::Wait => operator.wait_until_cleared(machine, dirs)?,
    }

    create_all(dirs)?;
    Ok(Prepared::Ready)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn machine() -> MachineId {
        "1".parse().unwrap()
    }

    struct Setup {
        _tmp: TempDir,
        machine_dir: PathBuf,
        dirs: Vec<PathBuf>,
    }

    fn setup() -> anyhow::Result<Setup> {
        let tmp = TempDir::with_prefix("pqc-results-session")?;
        let machine_dir = tmp.path().join("results").join("liboqs").join("machine-1");
        let dirs = vec![machine_dir.join("speed-results"), machine_dir.join("mem-results")];
        Ok(Setup {
            _tmp: tmp,
            machine_dir,
            dirs,
        })
    }

    /// Moves the old results away when asked to wait
    struct Scripted {
        answer: Resolution,
        asked: usize,
    }

    impl Operator for Scripted {
        fn choose(&mut self, _: &MachineId, _: &[PathBuf]) -> anyhow::Result<Resolution> {
            self.asked += 1;
            Ok(self.answer)
        }

        fn wait_until_cleared(&mut self, _: &MachineId, dirs: &[PathBuf]) -> anyhow::Result<()> {
            for d in dirs.iter().filter(|d| d.exists()) {
                fs::remove_dir_all(d)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_fresh_machine_is_not_asked() -> anyhow::Result<()> {
        let s = setup()?;
        let mut op = Scripted {
            answer: Resolution::Abort,
            asked: 0,
        };
        let prepared = prepare_output_dirs(&machine(), &s.machine_dir, &s.dirs, &mut op)?;
        assert_eq!(prepared, Prepared::Ready);
        assert_eq!(op.asked, 0);
        assert!(s.dirs.iter().all(|d| d.is_dir()));
        Ok(())
    }

    #[test]
    fn test_overwrite_only_removes_machine_dir() -> anyhow::Result<()> {
        let s = setup()?;
        create_all(&s.dirs)?;
        fs::write(s.dirs[0].join("old.csv"), "old")?;
        let other = s.machine_dir.with_file_name("machine-2");
        fs::create_dir_all(&other)?;

        let mut op = Scripted {
            answer: Resolution::Overwrite,
            asked: 0,
        };
        let prepared = prepare_output_dirs(&machine(), &s.machine_dir, &s.dirs, &mut op)?;
        assert_eq!(prepared, Prepared::Ready);
        assert!(!s.dirs[0].join("old.csv").exists());
        assert!(s.dirs.iter().all(|d| d.is_dir()));
        assert!(other.is_dir());
        Ok(())
    }

    #[test]
    fn test_abort_touches_nothing() -> anyhow::Result<()> {
        let s = setup()?;
        fs::create_dir_all(&s.dirs[1])?;
        fs::write(s.dirs[1].join("old.csv"), "old")?;

        let mut op = Scripted {
            answer: Resolution::Abort,
            asked: 0,
        };
        let prepared = prepare_output_dirs(&machine(), &s.machine_dir, &s.dirs, &mut op)?;
        assert_eq!(prepared, Prepared::Aborted);
        assert!(!s.dirs[0].exists());
        assert_eq!(fs::read_to_string(s.dirs[1].join("old.csv"))?, "old");
        Ok(())
    }

    #[test]
    fn test_wait_then_create() -> anyhow::Result<()> {
        let s = setup()?;
        create_all(&s.dirs)?;
        let mut op = Scripted {
            answer: Resolution::Wait,
            asked: 0,
        };
        let prepared = prepare_output_dirs(&machine(), &s.machine_dir, &s.dirs, &mut op)?;
        assert_eq!(prepared, Prepared::Ready);
        assert!(s.dirs.iter().all(|d| d.is_dir()));
        Ok(())
    }

    #[test]
    fn test_terminal_menu_repeats_on_bad_input() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut op = TerminalOperator::new(Cursor::new("9\n\nyes\n2\n"), &mut out);
        let answer = op.choose(&machine(), &[PathBuf::from("/r/speed-results")])?;
        assert_eq!(answer, Resolution::Abort);

        let text = String::from_utf8(out)?;
        assert_eq!(text.matches("Enter option: ").count(), 4);
        assert!(text.contains("machine-1"));
        assert!(text.contains("/r/speed-results"));
        Ok(())
    }

    #[test]
    fn test_terminal_menu_closed_input() {
        let mut op = TerminalOperator::new(Cursor::new(""), Vec::new());
        assert!(op.choose(&machine(), &[]).is_err());
    }

    #[test]
    fn test_terminal_wait_rechecks_after_enter() -> anyhow::Result<()> {
        let s = setup()?;
        let mut op = TerminalOperator::new(Cursor::new("\n"), Vec::new());
        // nothing left to wait for
        op.wait_until_cleared(&machine(), &s.dirs)?;

        create_all(&s.dirs)?;
        let mut op = TerminalOperator::new(Cursor::new("\n\n"), Vec::new());
        assert!(op.wait_until_cleared(&machine(), &s.dirs).is_err());
        Ok(())
    }

    #[test]
    fn test_policy_operator_wait_returns_when_cleared() -> anyhow::Result<()> {
        let s = setup()?;
        let mut op = PolicyOperator::new(Resolution::Wait, Duration::from_millis(1));
        assert_eq!(op.choose(&machine(), &s.dirs)?, Resolution::Wait);
        op.wait_until_cleared(&machine(), &s.dirs)?;
        Ok(())
    }
}

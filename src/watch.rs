// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Watch mode: re-run a command at a fixed interval until Ctrl+C.
//!
//! The signal handler only raises a flag. The loop checks it between
//! iterations and while sleeping, so output is never cut off mid-render.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::text::Line;
use tracing::debug;

use crate::ui::print::Printer;
use crate::ui::theme::Theme;

const SLEEP_STEP: Duration = Duration::from_millis(100);

/// Run `iteration` every `interval_secs` seconds until interrupted
pub fn run<F>(interval_secs: u64, color: bool, theme: &Theme, iteration: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();

    ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::SeqCst);
    })?;

    let mut printer = Printer::stdout(color);
    let clear = std::io::stdout().is_terminal();
    run_with_flag(
        &mut printer,
        Duration::from_secs(interval_secs),
        clear,
        &stop,
        theme,
        iteration,
    )
}

pub fn run_with_flag<W, F>(
    printer: &mut Printer<W>,
    interval: Duration,
    clear: bool,
    stop: &AtomicBool,
    theme: &Theme,
    mut iteration: F,
) -> Result<()>
where
    W: Write,
    F: FnMut() -> Result<()>,
{
    while !stop.load(Ordering::SeqCst) {
        if clear {
            printer.clear_screen()?;
        }

        if let Err(err) = iteration() {
            // Ctrl+C also reaches the scheduler command and fails it
            if stop.load(Ordering::SeqCst) {
                debug!("iteration interrupted: {:#}", err);
                break;
            }
            return Err(err);
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }

        printer.blank()?;
        printer.line(Line::styled(
            format!(
                "Refreshing every {}s... Press Ctrl+C to stop",
                interval.as_secs()
            ),
            theme.dim(),
        ))?;

        let deadline = Instant::now() + interval;
        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLEEP_STEP.min(deadline - now));
        }
    }

    printer.blank()?;
    printer.line(Line::styled("Watch mode stopped", theme.warning()))?;
    printer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn output(printer: Printer<Vec<u8>>) -> String {
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_stops_when_flag_is_raised() {
        let stop = AtomicBool::new(false);
        let mut printer = Printer::new(Vec::new(), 80, false);
        let mut runs = 0;

        run_with_flag(&mut printer, Duration::from_millis(10), false, &stop, &Theme::default(), || {
            runs += 1;
            if runs == 3 {
                stop.store(true, Ordering::SeqCst);
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(runs, 3);
        let text = output(printer);
        assert_eq!(text.matches("Refreshing every 0s... Press Ctrl+C to stop").count(), 2);
        assert!(text.trim_end().ends_with("Watch mode stopped"));
    }

    #[test]
    fn test_interrupted_iteration_is_not_an_error() {
        let stop = AtomicBool::new(false);
        let mut printer = Printer::new(Vec::new(), 80, false);

        let result = run_with_flag(&mut printer, Duration::from_secs(60), false, &stop, &Theme::default(), || {
            stop.store(true, Ordering::SeqCst);
            Err(anyhow!("sinfo killed by signal"))
        });

        assert!(result.is_ok());
        assert!(output(printer).contains("Watch mode stopped"));
    }

    #[test]
    fn test_failed_iteration_propagates() {
        let stop = AtomicBool::new(false);
        let mut printer = Printer::new(Vec::new(), 80, false);

        let err = run_with_flag(&mut printer, Duration::from_secs(60), false, &stop, &Theme::default(), || {
            Err(anyhow!("Cannot reach scheduler"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "Cannot reach scheduler");
        assert!(!output(printer).contains("Watch mode stopped"));
    }
}

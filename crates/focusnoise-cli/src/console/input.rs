use focusnoise_core::Control;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const DEFAULT_EXTEND_MINUTES: u64 = 5;

/// Parse one line typed during a session.
///
/// `p` pause/resume, `+`/`-` volume, `e [N]` extend by N minutes (5 by
/// default), `m ID` mute/unmute, `a ID` add, `r ID` remove, `q` quit.
pub fn parse_control(line: &str) -> Option<Control> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let arg = parts.next();

    let control = match (cmd, arg) {
        ("p" | "pause", None) => Control::TogglePause,
        ("+" | "=" | "w", None) => Control::VolumeUp,
        ("-" | "s", None) => Control::VolumeDown,
        ("q" | "quit", None) => Control::Cancel,
        ("e" | "extend", None) => Control::Extend(DEFAULT_EXTEND_MINUTES * 60),
        ("e" | "extend", Some(n)) => Control::Extend(n.parse::<u64>().ok()?.checked_mul(60)?),
        ("m" | "mute", Some(id)) => Control::ToggleLayer(id.to_string()),
        ("a" | "add", Some(id)) => Control::AddLayer(id.to_string()),
        ("r" | "remove", Some(id)) => Control::RemoveLayer(id.to_string()),
        _ => return None,
    };
    Some(control)
}

/// Feed Ctrl-C and stdin lines into the control channel. Must be called
/// from inside a tokio runtime.
pub fn spawn_controls(tx: mpsc::Sender<Control>) {
    let interrupt = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt.send(Control::Cancel).await;
        }
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_control(&line) {
                Some(control) => {
                    if tx.send(control).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => tracing::warn!(input = %line.trim(), "unknown command"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_keys() {
        assert_eq!(parse_control("p"), Some(Control::TogglePause));
        assert_eq!(parse_control(" + "), Some(Control::VolumeUp));
        assert_eq!(parse_control("-"), Some(Control::VolumeDown));
        assert_eq!(parse_control("q"), Some(Control::Cancel));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(parse_control("e"), Some(Control::Extend(300)));
        assert_eq!(parse_control("e 10"), Some(Control::Extend(600)));
        assert_eq!(parse_control("m rain"), Some(Control::ToggleLayer("rain".into())));
        assert_eq!(parse_control("a fire"), Some(Control::AddLayer("fire".into())));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_control(""), None);
        assert_eq!(parse_control("e soon"), None);
        assert_eq!(parse_control("m"), None);
        assert_eq!(parse_control("p now"), None);
        assert_eq!(parse_control("xyzzy"), None);
    }
}

//! The component command line.
//!
//! ```text
//! <name> [-inport <port> -inpath <path>]* [-outport=<port> -outpath=<path>]* [free...]
//! ```
//!
//! The parser is lenient about spelling: each flag may take its value as the
//! next argument or after `=`, with one or two leading dashes. `--` ends
//! flag recognition.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{PipeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Inport,
    Inpath,
    Outport,
    Outpath,
}

impl Flag {
    const ALL: [Flag; 4] = [Flag::Inport, Flag::Inpath, Flag::Outport, Flag::Outpath];

    fn name(self) -> &'static str {
        match self {
            Flag::Inport => "inport",
            Flag::Inpath => "inpath",
            Flag::Outport => "outport",
            Flag::Outpath => "outpath",
        }
    }
}

/// One port name bound to a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortArg {
    pub name: String,
    pub path: PathBuf,
}

/// Port bindings and free arguments of one component invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortArgs {
    pub inports: Vec<PortArg>,
    pub outports: Vec<PortArg>,
    pub free: Vec<String>,
}

impl PortArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inport(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.inports.push(PortArg {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    pub fn with_outport(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.outports.push(PortArg {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    pub fn with_free<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.free.extend(args.into_iter().map(Into::into));
        self
    }

    /// Path bound to the named inport, if any.
    pub fn inport(&self, name: &str) -> Option<&Path> {
        find(&self.inports, name)
    }

    /// Path bound to the named outport, if any.
    pub fn outport(&self, name: &str) -> Option<&Path> {
        find(&self.outports, name)
    }

    pub fn is_empty(&self) -> bool {
        self.inports.is_empty() && self.outports.is_empty() && self.free.is_empty()
    }

    /// Render the arguments that follow the process name.
    ///
    /// Inports use separate flag and value; outports use the `=` form.
    pub fn to_argv(&self) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(
            self.inports.len() * 4 + self.outports.len() * 2 + self.free.len(),
        );
        for port in &self.inports {
            argv.push(OsString::from("-inport"));
            argv.push(OsString::from(&port.name));
            argv.push(OsString::from("-inpath"));
            argv.push(port.path.clone().into_os_string());
        }
        for port in &self.outports {
            argv.push(OsString::from(format!("-outport={}", port.name)));
            let mut path = OsString::from("-outpath=");
            path.push(port.path.as_os_str());
            argv.push(path);
        }
        argv.extend(self.free.iter().map(OsString::from));
        argv
    }

    /// Parse a component's arguments (without the program name).
    ///
    /// Everything that is not a port flag becomes a free argument.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let (mut ports, rest) = Self::extract(args)?;
        let mut seen_terminator = false;
        for arg in rest {
            if !seen_terminator && arg == "--" {
                seen_terminator = true;
                continue;
            }
            ports.free.push(arg.to_string_lossy().into_owned());
        }
        Ok(ports)
    }

    /// Pull the port flags out of `args`, returning the untouched remainder.
    ///
    /// The remainder keeps its order and any `--` terminator, so it can be
    /// handed on to another argument parser.
    pub fn extract<I, S>(args: I) -> Result<(Self, Vec<OsString>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut ports = Self::default();
        let mut rest = Vec::new();
        let mut pending_in: Option<String> = None;
        let mut pending_out: Option<String> = None;

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            if arg == "--" {
                rest.push(arg);
                rest.extend(args.by_ref());
                break;
            }
            let Some((flag, inline)) = split_flag(&arg) else {
                rest.push(arg);
                continue;
            };
            let value = match inline {
                Some(value) => value,
                None => args
                    .next()
                    .ok_or_else(|| PipeError::MissingValue(format!("-{}", flag.name())))?,
            };

            match flag {
                Flag::Inport => {
                    if let Some(name) = pending_in.replace(lossy(value)) {
                        return Err(unpaired("-inport", name, "-inpath"));
                    }
                }
                Flag::Inpath => {
                    let name = pending_in
                        .take()
                        .ok_or_else(|| unpaired("-inpath", lossy(value.clone()), "-inport"))?;
                    ports.inports.push(PortArg {
                        name,
                        path: PathBuf::from(value),
                    });
                }
                Flag::Outport => {
                    if let Some(name) = pending_out.replace(lossy(value)) {
                        return Err(unpaired("-outport", name, "-outpath"));
                    }
                }
                Flag::Outpath => {
                    let name = pending_out
                        .take()
                        .ok_or_else(|| unpaired("-outpath", lossy(value.clone()), "-outport"))?;
                    ports.outports.push(PortArg {
                        name,
                        path: PathBuf::from(value),
                    });
                }
            }
        }

        if let Some(name) = pending_in {
            return Err(unpaired("-inport", name, "-inpath"));
        }
        if let Some(name) = pending_out {
            return Err(unpaired("-outport", name, "-outpath"));
        }
        Ok((ports, rest))
    }
}

fn find<'a>(ports: &'a [PortArg], name: &str) -> Option<&'a Path> {
    ports
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.path.as_path())
}

/// Recognize a port flag, returning its bare name and any `=value`.
fn split_flag(arg: &OsString) -> Option<(Flag, Option<OsString>)> {
    let text = arg.to_str()?;
    let body = text
        .strip_prefix("--")
        .or_else(|| text.strip_prefix('-'))?;
    let (name, inline) = match body.split_once('=') {
        Some((name, value)) => (name, Some(OsString::from(value))),
        None => (body, None),
    };
    let flag = Flag::ALL.into_iter().find(|known| known.name() == name)?;
    Some((flag, inline))
}

fn lossy(value: OsString) -> String {
    value.to_string_lossy().into_owned()
}

fn unpaired(flag: &'static str, name: String, expected: &'static str) -> PipeError {
    PipeError::UnpairedPort {
        flag,
        name,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_to_argv_layout() {
        let ports = PortArgs::new()
            .with_inport("IN", "/dev/shm/B.IN")
            .with_outport("OUT", "/dev/shm/C.IN")
            .with_free(["-v", "file.txt"]);

        assert_eq!(
            ports.to_argv(),
            argv(&[
                "-inport",
                "IN",
                "-inpath",
                "/dev/shm/B.IN",
                "-outport=OUT",
                "-outpath=/dev/shm/C.IN",
                "-v",
                "file.txt",
            ])
        );
    }

    #[test]
    fn test_parse_reads_back_to_argv() {
        let ports = PortArgs::new()
            .with_inport("IN", "/dev/shm/B.IN")
            .with_inport("CONF", "/dev/shm/B.CONF")
            .with_outport("OUT", "/dev/shm/C.IN")
            .with_free(["--follow", "x y"]);

        let parsed = PortArgs::parse(ports.to_argv()).unwrap();
        assert_eq!(parsed, ports);
    }

    #[test]
    fn test_parse_accepts_both_spellings() {
        let parsed = PortArgs::parse(argv(&[
            "--inport=IN",
            "-inpath",
            "/a",
            "-outport",
            "OUT",
            "--outpath",
            "/b",
        ]))
        .unwrap();

        assert_eq!(parsed.inport("IN"), Some(Path::new("/a")));
        assert_eq!(parsed.outport("OUT"), Some(Path::new("/b")));
        assert!(parsed.free.is_empty());
    }

    #[test]
    fn test_extract_keeps_remainder() {
        let (ports, rest) = PortArgs::extract(argv(&[
            "net.json",
            "-inport",
            "IN",
            "--debug",
            "-inpath",
            "/a",
            "--",
            "-inport",
        ]))
        .unwrap();

        assert_eq!(ports.inport("IN"), Some(Path::new("/a")));
        assert_eq!(rest, argv(&["net.json", "--debug", "--", "-inport"]));
    }

    #[test]
    fn test_parse_terminator() {
        let parsed = PortArgs::parse(argv(&["--", "-inport", "x"])).unwrap();
        assert!(parsed.inports.is_empty());
        assert_eq!(parsed.free, vec!["-inport", "x"]);
    }

    #[test]
    fn test_missing_value() {
        let err = PortArgs::parse(argv(&["-inport", "IN", "-inpath"])).unwrap_err();
        assert!(matches!(err, PipeError::MissingValue(ref f) if f == "-inpath"));
    }

    #[test]
    fn test_unpaired_ports() {
        let err = PortArgs::parse(argv(&["-inport", "IN"])).unwrap_err();
        assert!(matches!(err, PipeError::UnpairedPort { flag: "-inport", .. }));

        let err = PortArgs::parse(argv(&["-outpath=/x"])).unwrap_err();
        assert!(matches!(err, PipeError::UnpairedPort { flag: "-outpath", .. }));

        let err = PortArgs::parse(argv(&["-outport=A", "-outport=B", "-outpath=/x"])).unwrap_err();
        assert!(matches!(
            err,
            PipeError::UnpairedPort { flag: "-outport", ref name, .. } if name == "A"
        ));
    }

    #[test]
    fn test_similar_flags_are_free() {
        let parsed = PortArgs::parse(argv(&["-inports", "-x=1", "-"])).unwrap();
        assert_eq!(parsed.free, vec!["-inports", "-x=1", "-"]);
    }
}

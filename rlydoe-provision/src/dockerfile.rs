//! Reading and writing provisioning plans as Dockerfiles.
//!
//! `RUN` instructions are split on `&&`, and each command recognised as a
//! [`Step`] when it has a form the step renders back to. Anything else, e.g.
//! a pipe or a command with variable expansions, stays an opaque
//! [`Step::Run`].
use crate::{
    error::ProvisionError,
    plan::ProvisionPlan,
    step::{quote, ArchiveFormat, Step},
};
use std::collections::HashMap;

const CHECKSUM_COMMENT: &str = "# checksum:";

/// Parses a Dockerfile.
pub fn parse(text: &str) -> Result<ProvisionPlan, ProvisionError> {
    let mut base_image = None;
    let mut steps = Vec::new();
    let mut checksums = HashMap::new();

    for (line, instruction) in instructions(text, &mut checksums) {
        let syntax = |reason: &str| ProvisionError::Syntax {
            line,
            reason: reason.to_string(),
        };
        let (keyword, args) = match instruction.split_once(char::is_whitespace) {
            Some((k, a)) => (k.to_uppercase(), a.trim()),
            None => (instruction.to_uppercase(), ""),
        };

        match keyword.as_str() {
            "FROM" => {
                if base_image.is_some() {
                    return Err(syntax("multi-stage builds are not supported"));
                }
                let image = args
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| syntax("FROM without an image"))?;
                base_image = Some(image.to_string());
            }
            "ENV" => steps.extend(parse_env(args).map_err(|e| syntax(&e))?),
            "WORKDIR" => {
                if args.is_empty() {
                    return Err(syntax("WORKDIR without a path"));
                }
                steps.push(Step::Workdir {
                    path: args.to_string(),
                });
            }
            "COPY" => {
                let words: Vec<String> = words(args)
                    .map_err(|e| syntax(&e))?
                    .into_iter()
                    .filter(|w| !w.starts_with("--"))
                    .collect();
                let Some((dest, srcs)) = words.split_last().filter(|(_, s)| !s.is_empty())
                else {
                    return Err(syntax("COPY needs a source and a destination"));
                };
                steps.extend(srcs.iter().map(|src| Step::Copy {
                    src: src.clone(),
                    dest: dest.clone(),
                }));
            }
            "RUN" => {
                for mut step in parse_run(args).map_err(|e| syntax(&e))? {
                    if let Step::Download { dest, checksum, .. } = &mut step {
                        *checksum = checksums.remove(dest.as_str());
                    }
                    steps.push(step);
                }
            }
            _ => {
                return Err(ProvisionError::UnsupportedInstruction {
                    line,
                    instruction: keyword,
                })
            }
        }
    }

    let mut plan = ProvisionPlan::new(base_image.ok_or(ProvisionError::MissingBaseImage)?);
    plan.steps = steps;
    Ok(plan)
}

/// Renders a plan as a Dockerfile.
///
/// Consecutive shell steps share one `RUN` instruction. Download checksums
/// are kept in comments that [`parse`] reads back.
pub fn render(plan: &ProvisionPlan) -> String {
    let mut out = format!("FROM {}\n", plan.base_image);
    let mut run: Vec<String> = Vec::new();

    let flush = |out: &mut String, run: &mut Vec<String>| {
        if !run.is_empty() {
            out.push_str(&format!("RUN {}\n", run.join(" && \\\n    ")));
            run.clear();
        }
    };

    for step in &plan.steps {
        match step {
            Step::Env { key, value } => {
                flush(&mut out, &mut run);
                out.push_str(&format!("\nENV {}={}\n", key, quote(value)));
            }
            Step::Workdir { path } => {
                flush(&mut out, &mut run);
                out.push_str(&format!("\nWORKDIR {}\n", path));
            }
            Step::Copy { src, dest } => {
                flush(&mut out, &mut run);
                out.push_str(&format!("\nCOPY {} {}\n", quote(src), quote(dest)));
            }
            Step::Run { command } if changes_dir_in(command) => {
                flush(&mut out, &mut run);
                out.push_str(&format!("\nRUN {}\n", command));
            }
            _ => {
                if run.is_empty() {
                    out.push('\n');
                }
                if let Step::Download {
                    dest,
                    checksum: Some(sum),
                    ..
                } = step
                {
                    // lands above the pending RUN instruction
                    out.push_str(&format!("{} {} {}\n", CHECKSUM_COMMENT, dest, sum));
                }
                if let Some(cmd) = step.shell_command() {
                    run.push(cmd);
                }
            }
        }
    }
    flush(&mut out, &mut run);
    out
}

/// Logical instructions with their first line, comments and blanks removed.
fn instructions(text: &str, checksums: &mut HashMap<String, String>) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (i, physical) in text.lines().enumerate() {
        let trimmed = physical.trim();
        if let Some(rest) = trimmed.strip_prefix(CHECKSUM_COMMENT) {
            let mut parts = rest.split_whitespace();
            if let (Some(dest), Some(sum)) = (parts.next(), parts.next()) {
                checksums.insert(dest.to_string(), sum.to_string());
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (start, mut buf) = current.take().unwrap_or((i + 1, String::new()));
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                buf.push_str(head);
                buf.push(' ');
                current = Some((start, buf));
            }
            None => {
                buf.push_str(trimmed);
                out.push((start, buf));
            }
        }
    }
    if let Some(last) = current {
        out.push(last);
    }
    out
}

fn parse_env(args: &str) -> Result<Vec<Step>, String> {
    let words = words(args)?;
    let first = words.first().ok_or("ENV without a variable")?;

    if !first.contains('=') {
        // legacy `ENV KEY value with spaces`
        let value = args[first.len()..].trim();
        return Ok(vec![Step::Env {
            key: first.clone(),
            value: value.to_string(),
        }]);
    }

    words
        .iter()
        .map(|w| match w.split_once('=') {
            Some((k, v)) if !k.is_empty() => Ok(Step::Env {
                key: k.to_string(),
                value: v.to_string(),
            }),
            _ => Err(format!("expected KEY=VALUE, got `{}`", w)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word { text: String, expands: bool },
    Op(String),
}

/// Tokens of a shell command line with their byte spans.
fn lex(s: &str) -> Result<Vec<(Token, usize, usize)>, String> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let n = chars.len();
    let offset = |i: usize| chars.get(i).map(|&(o, _)| o).unwrap_or(s.len());
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < n {
        let c = chars[i].1;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }
        if "&|;<>()".contains(c) {
            let double = matches!(
                (c, chars.get(i + 1).map(|&(_, c)| c)),
                ('&', Some('&')) | ('|', Some('|')) | ('>', Some('>')) | (';', Some(';'))
            );
            let len = if double { 2 } else { 1 };
            let (start, end) = (offset(i), offset(i + len));
            tokens.push((Token::Op(s[start..end].to_string()), start, end));
            i += len;
            continue;
        }

        let start = i;
        let mut text = String::new();
        let mut expands = false;
        while i < n {
            let c = chars[i].1;
            if c.is_whitespace() || "&|;<>()".contains(c) {
                break;
            }
            match c {
                '\'' => {
                    i += 1;
                    loop {
                        match chars.get(i) {
                            None => return Err("unterminated quote".to_string()),
                            Some(&(_, '\'')) => break,
                            Some(&(_, c)) => text.push(c),
                        }
                        i += 1;
                    }
                    i += 1;
                }
                '"' => {
                    i += 1;
                    loop {
                        match chars.get(i).map(|&(_, c)| c) {
                            None => return Err("unterminated quote".to_string()),
                            Some('"') => break,
                            Some('\\')
                                if matches!(
                                    chars.get(i + 1).map(|&(_, c)| c),
                                    Some('"' | '\\' | '$' | '`')
                                ) =>
                            {
                                i += 1;
                                text.push(chars[i].1);
                            }
                            Some(c) => {
                                expands |= c == '$' || c == '`';
                                text.push(c);
                            }
                        }
                        i += 1;
                    }
                    i += 1;
                }
                '\\' => {
                    if let Some(&(_, c)) = chars.get(i + 1) {
                        text.push(c);
                    }
                    i += 2;
                }
                c => {
                    expands |= c == '$' || c == '`';
                    text.push(c);
                    i += 1;
                }
            }
        }
        tokens.push((Token::Word { text, expands }, offset(start), offset(i)));
    }

    Ok(tokens)
}

/// Words of a Dockerfile argument list, after quote removal.
fn words(s: &str) -> Result<Vec<String>, String> {
    lex(s).map(|tokens| {
        tokens
            .into_iter()
            .map(|(t, start, end)| match t {
                Token::Word { text, .. } => text,
                Token::Op(_) => s[start..end].to_string(),
            })
            .collect()
    })
}

fn parse_run(body: &str) -> Result<Vec<Step>, String> {
    let tokens = lex(body)?;
    let segments: Vec<_> = tokens
        .split(|(t, _, _)| matches!(t, Token::Op(op) if op == "&&"))
        .collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err("empty command around `&&`".to_string());
    }
    // A `cd` only lasts for the rest of its shell, so the chain runs as one.
    if segments.iter().any(|segment| changes_dir(segment)) {
        return Ok(vec![Step::Run {
            command: body.trim().to_string(),
        }]);
    }

    let mut steps: Vec<Step> = Vec::new();
    let mut apt_update_pending = false;

    for segment in segments {
        let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
            return Err("empty command around `&&`".to_string());
        };
        let raw = body[first.1..last.2].trim().to_string();

        let simple: Option<Vec<String>> = segment
            .iter()
            .map(|(t, _, _)| match t {
                Token::Word {
                    text,
                    expands: false,
                } => Some(text.clone()),
                _ => None,
            })
            .collect();

        let step = match simple {
            Some(words) => {
                let words = strip_sudo(&words);
                if is_apt_update(words) {
                    apt_update_pending = true;
                    continue;
                }
                classify(words).unwrap_or(Step::Run {
                    command: raw.clone(),
                })
            }
            None => Step::Run {
                command: raw.clone(),
            },
        };

        if apt_update_pending {
            apt_update_pending = false;
            if !matches!(step, Step::Apt { .. }) {
                steps.push(Step::Run {
                    command: "apt-get update".to_string(),
                });
            }
        }
        steps.push(step);
    }

    if apt_update_pending {
        steps.push(Step::Run {
            command: "apt-get update".to_string(),
        });
    }
    Ok(steps)
}

fn changes_dir_in(command: &str) -> bool {
    lex(command).map_or(false, |tokens| {
        tokens
            .split(|(t, _, _)| matches!(t, Token::Op(op) if op == "&&"))
            .any(changes_dir)
    })
}

fn changes_dir(segment: &[(Token, usize, usize)]) -> bool {
    let mut words = segment.iter().filter_map(|(t, _, _)| match t {
        Token::Word { text, .. } => Some(text.as_str()),
        Token::Op(_) => None,
    });
    matches!(words.next(), Some("cd") | Some("pushd"))
}

fn strip_sudo(words: &[String]) -> &[String] {
    match words.first() {
        Some(w) if w == "sudo" => &words[1..],
        _ => words,
    }
}

fn is_apt_update(words: &[String]) -> bool {
    matches!(words.first().map(String::as_str), Some("apt-get" | "apt"))
        && words[1..]
            .iter()
            .filter(|w| !w.starts_with('-'))
            .map(String::as_str)
            .eq(["update"])
}

/// Splits `args` into flags and operands, failing on a flag not in `allowed`.
///
/// Flags in `with_value` take the following word as their value.
fn options<'a>(
    args: &'a [String],
    allowed: &[&str],
    with_value: &[&str],
) -> Option<(HashMap<&'a str, &'a str>, Vec<&'a str>)> {
    let mut values = HashMap::new();
    let mut operands = Vec::new();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        if let Some((flag, value)) = arg.split_once('=').filter(|(f, _)| f.starts_with("--")) {
            if !with_value.contains(&flag) {
                return None;
            }
            values.insert(flag, value);
        } else if with_value.contains(&arg.as_str()) {
            values.insert(arg.as_str(), it.next()?.as_str());
        } else if arg.starts_with('-') && arg.len() > 1 {
            if !allowed.contains(&arg.as_str()) {
                return None;
            }
        } else {
            operands.push(arg.as_str());
        }
    }
    Some((values, operands))
}

fn url_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    match (trimmed.is_empty(), dir.starts_with('/')) {
        (true, true) => "/".to_string(),
        (true, false) => ".".to_string(),
        _ => trimmed.to_string(),
    }
}

fn is_url(s: &str) -> bool {
    ["http://", "https://", "ftp://"]
        .iter()
        .any(|p| s.starts_with(p))
}

/// Recognises a simple command as a typed step.
fn classify(words: &[String]) -> Option<Step> {
    let (program, args) = words.split_first()?;
    let args_str: Vec<&str> = args.iter().map(String::as_str).collect();

    match program.as_str() {
        "apt-get" | "apt" => {
            let flags = [
                "-y",
                "--yes",
                "--assume-yes",
                "-q",
                "-qq",
                "--no-install-recommends",
            ];
            let (_, operands) = options(args, &flags, &[])?;
            let (cmd, packages) = operands.split_first()?;
            (*cmd == "install" && !packages.is_empty()).then(|| Step::Apt {
                packages: packages.iter().map(|s| s.to_string()).collect(),
            })
        }
        "wget" => {
            let flags = ["-q", "--quiet", "-nv", "--no-verbose", "-c", "--continue"];
            let (values, operands) =
                options(args, &flags, &["-O", "--output-document", "-P", "--directory-prefix"])?;
            let [url] = operands.as_slice() else {
                return None;
            };
            if !is_url(url) {
                return None;
            }
            let output = values.get("-O").or_else(|| values.get("--output-document"));
            let prefix = values.get("-P").or_else(|| values.get("--directory-prefix"));
            let dest = match (output, prefix) {
                (Some(&"-"), _) => return None,
                (Some(o), _) => o.to_string(),
                (None, Some(p)) => format!("{}/{}", normalize_dir(p), url_file_name(url)?),
                (None, None) => url_file_name(url)?.to_string(),
            };
            Some(Step::Download {
                url: url.to_string(),
                dest,
                checksum: None,
            })
        }
        "curl" => {
            let mut output = None;
            let mut remote_name = false;
            let mut url = None;
            let mut it = args_str.iter();
            while let Some(&arg) = it.next() {
                match arg {
                    "-o" | "--output" => output = Some(it.next()?.to_string()),
                    "-O" | "--remote-name" => remote_name = true,
                    "--location" | "--silent" | "--show-error" | "--fail" => {}
                    _ if arg.starts_with('-') && !arg.starts_with("--") => {
                        let cluster = &arg[1..];
                        if !cluster.chars().all(|c| "LsSfoO".contains(c)) {
                            return None;
                        }
                        remote_name |= cluster.contains('O');
                        if cluster.contains('o') {
                            if !cluster.ends_with('o') {
                                return None;
                            }
                            output = Some(it.next()?.to_string());
                        }
                    }
                    _ if is_url(arg) && url.is_none() => url = Some(arg),
                    _ => return None,
                }
            }
            let url = url?;
            let dest = match (output, remote_name) {
                (Some(o), _) => o,
                (None, true) => url_file_name(url)?.to_string(),
                (None, false) => return None,
            };
            Some(Step::Download {
                url: url.to_string(),
                dest,
                checksum: None,
            })
        }
        "unrar" => {
            let (cmd, rest) = args.split_first()?;
            if cmd != "x" && cmd != "e" {
                return None;
            }
            let (_, operands) = options(rest, &["-o+", "-o-", "-y", "-inul"], &[])?;
            let (archive, dest) = match operands.as_slice() {
                [archive] => (archive, "."),
                [archive, dest] => (archive, *dest),
                _ => return None,
            };
            Some(Step::Extract {
                archive: archive.to_string(),
                dest: normalize_dir(dest),
                format: ArchiveFormat::Rar,
            })
        }
        "unzip" => {
            let (values, operands) = options(args, &["-o", "-q", "-qq", "-n"], &["-d"])?;
            let [archive] = operands.as_slice() else {
                return None;
            };
            Some(Step::Extract {
                archive: archive.to_string(),
                dest: normalize_dir(values.get("-d").copied().unwrap_or(".")),
                format: ArchiveFormat::Zip,
            })
        }
        "tar" => {
            let mut letters = String::new();
            let mut archive = None;
            let mut dest = ".".to_string();
            let mut it = args_str.iter();
            let mut first = true;
            while let Some(&arg) = it.next() {
                let cluster = arg
                    .strip_prefix('-')
                    .filter(|c| !c.starts_with('-'))
                    .or_else(|| first.then(|| arg));
                first = false;
                match (arg, cluster) {
                    ("-C", _) => dest = normalize_dir(it.next()?),
                    (_, _) if arg.starts_with("--directory=") => {
                        dest = normalize_dir(&arg["--directory=".len()..])
                    }
                    (_, Some(c)) if c.chars().all(|c| "xzvfp".contains(c)) => {
                        letters.push_str(c);
                        if c.contains('f') {
                            archive = Some(it.next()?.to_string());
                        }
                    }
                    _ => return None,
                }
            }
            let archive = archive?;
            let is_tar_gz = ArchiveFormat::from_path(&archive) == Some(ArchiveFormat::TarGz);
            (letters.contains('x') && is_tar_gz).then(|| Step::Extract {
                archive,
                dest,
                format: ArchiveFormat::TarGz,
            })
        }
        "bash" | "sh" => {
            let (installer, rest) = args.split_first()?;
            if !installer.ends_with(".sh") {
                return None;
            }
            let (values, _) =
                options(rest, &["-b", "-u"], &["-p"]).filter(|(_, o)| o.is_empty())?;
            if !rest.iter().any(|a| a == "-b") {
                return None;
            }
            Some(Step::InstallConda {
                installer: installer.clone(),
                prefix: values.get("-p")?.to_string(),
            })
        }
        "conda" => match args_str.as_slice() {
            ["env", "create", "-f" | "--file", file] => Some(Step::CondaCreate {
                file: file.to_string(),
            }),
            _ => None,
        },
        "python" | "python3" => match args_str.as_slice() {
            ["-m", "atari_py.import_roms", dir] => Some(Step::ImportRoms {
                dir: dir.to_string(),
            }),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    const DOCKERFILE: &str = r#"FROM nvidia/cuda:10.1-cudnn7-runtime-ubuntu18.04

ENV LANG=C.UTF-8 LC_ALL=C.UTF-8
ENV PATH /root/miniconda3/bin:$PATH

RUN apt-get update && apt-get install -y --no-install-recommends \
        wget unrar unzip libgl1-mesa-dev libosmesa6-dev patchelf && \
    rm -rf /var/lib/apt/lists/*

RUN wget -q https://repo.anaconda.com/miniconda/Miniconda3-latest-Linux-x86_64.sh && \
    bash Miniconda3-latest-Linux-x86_64.sh -b -p /root/miniconda3

# MuJoCo
RUN mkdir -p ~/.mujoco && \
    wget https://www.roboti.us/download/mujoco200_linux.zip -O mujoco.zip && \
    unzip mujoco.zip -d ~/.mujoco && \
    curl -sSLo ~/.mujoco/mjkey.txt https://www.roboti.us/file/mjkey.txt

WORKDIR /workspace
COPY environment.yml .
RUN conda env create -f environment.yml

RUN wget http://www.atarimania.com/roms/Roms.rar && \
    unrar x Roms.rar && \
    unzip ROMS.zip && unzip "HC ROMS.zip" && \
    python -m atari_py.import_roms ROMS
"#;

    #[test]
    fn test_parse() {
        let plan = parse(DOCKERFILE).unwrap();
        assert_eq!(plan.base_image, "nvidia/cuda:10.1-cudnn7-runtime-ubuntu18.04");

        let kinds: Vec<&str> = plan.steps.iter().map(Step::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "env",
                "env",
                "env",
                "apt",
                "run",
                "download",
                "install_conda",
                "run",
                "download",
                "extract",
                "download",
                "workdir",
                "copy",
                "conda_create",
                "download",
                "extract",
                "extract",
                "extract",
                "import_roms",
            ]
        );
        assert_eq!(
            plan.steps[2],
            Step::Env {
                key: "PATH".to_string(),
                value: "/root/miniconda3/bin:$PATH".to_string()
            }
        );
        assert_eq!(
            plan.steps[3],
            Step::Apt {
                packages: [
                    "wget",
                    "unrar",
                    "unzip",
                    "libgl1-mesa-dev",
                    "libosmesa6-dev",
                    "patchelf"
                ]
                .iter()
                .map(|s| s.to_string())
                .collect()
            }
        );
        assert_eq!(
            plan.steps[5],
            Step::Download {
                url: "https://repo.anaconda.com/miniconda/Miniconda3-latest-Linux-x86_64.sh"
                    .to_string(),
                dest: "Miniconda3-latest-Linux-x86_64.sh".to_string(),
                checksum: None
            }
        );
        assert_eq!(
            plan.steps[10],
            Step::Download {
                url: "https://www.roboti.us/file/mjkey.txt".to_string(),
                dest: "~/.mujoco/mjkey.txt".to_string(),
                checksum: None
            }
        );
        assert_eq!(
            plan.steps[17],
            Step::Extract {
                archive: "HC ROMS.zip".to_string(),
                dest: ".".to_string(),
                format: ArchiveFormat::Zip
            }
        );
    }

    #[test]
    fn test_render_parses_back() {
        let mut plan = parse(DOCKERFILE).unwrap();
        if let Step::Download { checksum, .. } = &mut plan.steps[8] {
            *checksum = Some("xxh3:0123456789abcdef".to_string());
        }
        let text = render(&plan);
        assert!(text.starts_with("FROM nvidia/cuda:10.1-cudnn7-runtime-ubuntu18.04\n"));
        assert!(text.contains("# checksum: mujoco.zip xxh3:0123456789abcdef\n"));
        assert_eq!(parse(&text).unwrap(), plan);
    }

    #[test]
    fn test_opaque_commands() {
        let steps = parse_run("echo $HOME > out.txt && wget -O - https://x.org/a | sh").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Run {
                    command: "echo $HOME > out.txt".to_string()
                },
                Step::Run {
                    command: "wget -O - https://x.org/a | sh".to_string()
                },
            ]
        );
        assert_eq!(
            parse_run("apt-get update").unwrap(),
            vec![Step::Run {
                command: "apt-get update".to_string()
            }]
        );
        assert_eq!(
            parse_run("tar -xzf mujoco.tar.gz -C /opt").unwrap(),
            vec![Step::Extract {
                archive: "mujoco.tar.gz".to_string(),
                dest: "/opt".to_string(),
                format: ArchiveFormat::TarGz
            }]
        );
    }

    #[test]
    fn test_directory_change_keeps_chain() {
        assert_eq!(
            parse_run("cd /opt/roms && unzip ROMS.zip").unwrap(),
            vec![Step::Run {
                command: "cd /opt/roms && unzip ROMS.zip".to_string()
            }]
        );

        let plan = parse(
            "FROM ubuntu:18.04\nRUN apt-get update && apt-get install -y unzip\nRUN cd /opt/roms && unzip ROMS.zip\n",
        )
        .unwrap();
        let kinds: Vec<&str> = plan.steps.iter().map(Step::kind).collect();
        assert_eq!(kinds, vec!["apt", "run"]);
        assert_eq!(parse(&render(&plan)).unwrap(), plan);

        let mut mixed = plan.clone();
        mixed.steps.push(Step::Run {
            command: "echo done".to_string(),
        });
        assert!(render(&mixed).contains("\nRUN cd /opt/roms && unzip ROMS.zip\n\nRUN echo done\n"));
        assert_eq!(parse(&render(&mixed)).unwrap(), mixed);

        let report = crate::check::PlanReport::check(&plan);
        assert!(report.is_ok());
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("RUN echo hi\n"), Err(ProvisionError::MissingBaseImage));
        assert_eq!(
            parse("FROM ubuntu\nCMD [\"bash\"]\n"),
            Err(ProvisionError::UnsupportedInstruction {
                line: 2,
                instruction: "CMD".to_string()
            })
        );
        assert!(matches!(
            parse("FROM ubuntu\nRUN echo 'open\n"),
            Err(ProvisionError::Syntax { line: 2, .. })
        ));
    }
}

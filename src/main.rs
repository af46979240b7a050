use std::{env, fs::read_to_string, path::Path, process::exit, time::Instant};

use log::{LevelFilter, Log, Metadata, Record};
use shadec::{
    compiler::{
        compiler::{CompileOptions, Compiler, ShaderTarget},
        stdlib::Builtins,
    },
    emitter::instruction::{Binding, Program},
    errors::errors::Error,
    format_error,
    ir::backend::BackendKind,
    lexer::lexer::tokenize,
    parser::parser::parse,
};

const USAGE: &str = "usage: shadec <file> [--vertex|--fragment] [--structured] [--temps N]";

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Level comes from `SHADEC_LOG` (error, warn, info, debug or trace).
fn init_logging() {
    let level = env::var("SHADEC_LOG")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

struct Args {
    path: String,
    options: CompileOptions,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut options = CompileOptions::default();
    let mut path = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--vertex" => options.target = ShaderTarget::Vertex,
            "--fragment" => options.target = ShaderTarget::Fragment,
            "--structured" => options.backend = BackendKind::Structured,
            "--temps" => {
                let value = iter.next().ok_or("--temps needs a register count")?;
                options.max_temporaries = value
                    .parse()
                    .map_err(|_| format!("invalid register count {:?}", value))?;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag {}", flag)),
            file => {
                if path.replace(file.to_string()).is_some() {
                    return Err(String::from("more than one input file"));
                }
            }
        }
    }

    let path = path.ok_or("no input file")?;
    Ok(Args { path, options })
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            exit(2);
        }
    };

    let source = match read_to_string(&args.path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Failed to read {}: {}", args.path, error);
            exit(1);
        }
    };
    let file_name = Path::new(&args.path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| args.path.clone());

    match compile(&source, file_name, &args.options) {
        Ok(program) => {
            print!("{}", program);
            print_bindings(&program);
        }
        Err(error) => {
            eprint!("{}", format_error(&error, &source));
            exit(1);
        }
    }
}

fn compile(source: &str, file: String, options: &CompileOptions) -> Result<Program, Error> {
    let start = Instant::now();
    let builtins = Builtins::load()?;
    eprintln!("Loaded built-ins in {:?}", start.elapsed());

    let tokenize_start = Instant::now();
    let tokens = tokenize(source, Some(file.clone()))?;
    eprintln!("Tokenized in {:?}", tokenize_start.elapsed());

    let parse_start = Instant::now();
    let unit = parse(tokens, Some(file), Some(&builtins))?;
    eprintln!("Parsed in {:?}", parse_start.elapsed());

    let compile_start = Instant::now();
    let (program, warnings) = Compiler::new(unit, options).compile()?;
    eprintln!(
        "Compiled in {:?} ({} instructions, {} temporaries, {} backend)",
        compile_start.elapsed(),
        program.instructions.len(),
        program.temporaries,
        options.backend
    );

    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
    eprintln!("Total time: {:?}", start.elapsed());
    Ok(program)
}

fn print_bindings(program: &Program) {
    let groups: [(&str, &[Binding]); 4] = [
        ("uniform", &program.uniforms),
        ("input", &program.inputs),
        ("output", &program.outputs),
        ("sampler", &program.samplers),
    ];
    for (kind, bindings) in groups {
        for binding in bindings {
            println!("# {} {} = {}", kind, binding.name, binding.storage);
        }
    }
}

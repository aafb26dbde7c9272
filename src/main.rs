//! KeySeal 命令行入口
//!
//! 用法：
//!   keyseal encrypt <input> [--out-dir DIR]
//!   keyseal decrypt <encrypted> <key-file> [--out-dir DIR]
//!   keyseal inspect <key-file>
//!
//! 所有实际逻辑都委托给 keyseal 库；这里只负责参数解析与日志初始化。

use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keyseal::format::record;
use keyseal::{Options, PayloadLayout};

#[derive(Parser)]
#[command(name = "keyseal")]
#[command(about = "Encrypt a file with AES-256-CBC and a separate key record")]
#[command(version)]
struct Cli {
    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 加密文件，生成 .enc 与 .key.txt
    Encrypt {
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// 使用密钥记录解密文件
    Decrypt {
        encrypted: PathBuf,
        key_file: PathBuf,

        /// 密钥记录缺少原始文件名时使用的文件名
        #[arg(long, default_value = keyseal::config::DEFAULT_FALLBACK_FILENAME)]
        fallback_name: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// 校验密钥记录，不输出密钥
    Inspect { key_file: PathBuf },
}

#[derive(Args)]
struct OutputArgs {
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// 密文布局：detached 或 iv-prefixed
    #[arg(long, default_value_t = PayloadLayout::Detached)]
    layout: PayloadLayout,

    /// 覆盖已存在的解密输出文件
    #[arg(short, long)]
    force: bool,
}

impl OutputArgs {
    fn options(&self) -> Options {
        Options::default()
            .with_layout(self.layout)
            .with_overwrite(self.force)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Encrypt { input, output } => {
            let (encrypted, key_file) = keyseal::encrypt(&input, &output.out_dir, &output.options())
                .with_context(|| format!("failed to encrypt {}", input.display()))?;

            println!("Encrypted file: {}", encrypted.display());
            println!("Key file:       {}", key_file.display());
        }
        Command::Decrypt {
            encrypted,
            key_file,
            fallback_name,
            output,
        } => {
            let options = output.options().with_fallback_filename(fallback_name);
            let restored = keyseal::decrypt(&encrypted, &key_file, &output.out_dir, &options)
                .with_context(|| format!("failed to decrypt {}", encrypted.display()))?;

            println!("Decrypted file: {}", restored.display());
        }
        Command::Inspect { key_file } => {
            let text = std::fs::read_to_string(&key_file)
                .with_context(|| format!("failed to read {}", key_file.display()))?;
            let parsed = record::parse(&text, keyseal::config::DEFAULT_FALLBACK_FILENAME)
                .context("invalid key record")?;

            println!("Original filename:  {}", parsed.original_filename);
            println!(
                "Encrypted filename: {}",
                parsed.encrypted_filename.as_deref().unwrap_or("-")
            );
            println!("Method:             {}", record::METHOD);
            println!("Key and IV:         valid");
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

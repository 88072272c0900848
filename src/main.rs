//! # voicepack CLI
//!
//! Command-line interface for the voicepack library.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;

use voicepack::VoicepackError;
use voicepack::alias::{AliasLookup, MemoryAliasStore, NoAliases};
use voicepack::cli::Args;
use voicepack::config::EngineConfig;
use voicepack::diagnostics::Warning;
use voicepack::engine::{AttachmentMap, Engine, RunOutput};
use voicepack::output::{write_conversation, write_index, write_stats_csv};
use voicepack::parsers::VoiceHtmlParser;

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), VoicepackError> {
    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();

    let config = build_config(&args)?;
    config.validate()?;

    // Print header
    println!("📦 voicepack v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:   {}", args.input);
    println!("💾 Output:  {}", args.output);
    println!("📞 Own:     {}", config.own_number);
    if let Some(ref date) = args.newer_than {
        println!("📅 After:   {}", date);
    }
    if let Some(ref date) = args.older_than {
        println!("📅 Before:  {}", date);
    }
    println!();

    // Aliases, if supplied
    let aliases: Box<dyn AliasLookup> = match args.aliases {
        Some(ref path) => {
            let store = MemoryAliasStore::load_json(Path::new(path))?;
            println!("👤 Aliases: {} loaded", store.len());
            Box::new(store)
        }
        None => Box::new(NoAliases),
    };

    // Attachment mapping, built once before dispatch
    let attachments_dir = args.attachments_dir.as_ref().unwrap_or(&args.input);
    println!("🗂️  Mapping attachments...");
    let attachments = AttachmentMap::from_dir(Path::new(attachments_dir))?;
    println!("   {} attachment files mapped", attachments.len());

    // Discover fragments
    let fragments = discover_fragments(Path::new(&args.input))?;
    println!("⏳ Processing {} fragments...", fragments.len());

    let parser = VoiceHtmlParser::new();
    let engine = Engine::new(&config, &parser, aliases.as_ref(), &attachments)?;
    let run_start = Instant::now();
    let output = engine.run(fragments);
    let run_time = run_start.elapsed();
    println!(
        "   {} conversations reconstructed ({:.2}s)",
        output.conversations.len(),
        run_time.as_secs_f64()
    );

    // Write artifacts
    fs::create_dir_all(&args.output)?;
    let out_dir = Path::new(&args.output);
    println!("💾 Writing artifacts...");
    for conversation in &output.conversations {
        write_conversation(conversation, out_dir)?;
    }
    write_index(&output, out_dir)?;

    if let Some(ref csv_path) = args.stats_csv {
        write_stats_csv(&output.conversations, Path::new(csv_path))?;
        println!("   Statistics table written to {}", csv_path);
    }

    print_summary(&output, total_start.elapsed().as_secs_f64());
    Ok(())
}

fn build_config(args: &Args) -> Result<EngineConfig, VoicepackError> {
    let mut config = EngineConfig::new(&args.own_number)?
        .with_alias_required(args.require_alias)
        .with_include_service_codes(args.include_service_codes)
        .with_workers(args.workers);

    if let Some(ref date) = args.newer_than {
        config = config.with_newer_than(date)?;
    }
    if let Some(ref date) = args.older_than {
        config = config.with_older_than(date)?;
    }
    Ok(config)
}

/// Lists `*.html` fragments under the input directory.
fn discover_fragments(dir: &Path) -> Result<Vec<PathBuf>, VoicepackError> {
    let mut fragments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "html") {
            fragments.push(path);
        }
    }
    fragments.sort();
    Ok(fragments)
}

fn print_summary(output: &RunOutput, total_secs: f64) {
    let totals = &output.totals;

    println!();
    println!("📊 Summary:");
    println!(
        "   Conversations: {} ({} groups)",
        output.conversations.len(),
        output.conversations.iter().filter(|c| c.is_group).count()
    );
    println!(
        "   Messages:      {} ({} sms, {} mms, {} calls, {} voicemails)",
        totals.message_total(),
        totals.sms,
        totals.mms,
        totals.call,
        totals.voicemail
    );
    println!(
        "   Media:         {} ({} img, {} vcf, {} audio, {} video)",
        totals.media_total(),
        totals.img,
        totals.vcf,
        totals.audio,
        totals.video
    );

    let summary = &output.summary;
    if !summary.is_clean() {
        println!();
        println!("⚠️  Diagnostics:");
        if summary.skipped_fragments > 0 {
            println!("   Skipped fragments:          {}", summary.skipped_fragments);
        }
        if summary.orphan_attachments > 0 {
            println!("   Orphan attachments:         {}", summary.orphan_attachments);
        }
        if summary.low_confidence_resolutions > 0 {
            println!(
                "   Low-confidence resolutions: {}",
                summary.low_confidence_resolutions
            );
        }
        if summary.unknown_group_senders > 0 {
            println!(
                "   Unknown group senders:      {}",
                summary.unknown_group_senders
            );
        }
        for warning in &output.warnings {
            if let Warning::SkippedFragment { path, reason } = warning {
                println!("   skipped {}: {}", path.display(), reason);
            }
        }
    }

    println!();
    println!("✅ Done in {:.2}s", total_secs);
}

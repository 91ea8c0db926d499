//! Command implementations

use crate::cli::{ReferenceArgs, SourceArgs};
use anyhow::{Context, Result};
use encstr_crypto::RecordCipher;
use encstr_decoder::{
    DecoderConfig, DirectoryContentStore, LanguageId, StaticMetadata, StringDecoder, StringTable,
    TableMetadataProvider,
};
use encstr_formats::{RecordUnpacker, parse_reference, postprocess};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Polls needed once the table is loaded: one to queue, one to read back
const DECODE_POLLS: usize = 2;

#[derive(Debug, Serialize)]
struct ParseOutput {
    index: u64,
    key: u64,
    encrypted: bool,
    derived_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct DecodeOutput {
    language: LanguageId,
    index: u64,
    key: u64,
    text: String,
}

#[derive(Debug, Serialize)]
struct DumpRow {
    index: u64,
    size: usize,
    base_char: u16,
    bits_per_char: u8,
    preview: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_output(raw: &[u8]) -> ParseOutput {
    let parsed = parse_reference(raw);
    let cipher = RecordCipher::new(parsed.key).ok();
    ParseOutput {
        index: parsed.index,
        key: parsed.key,
        encrypted: cipher.is_some(),
        derived_key: cipher.map(|cipher| hex::encode(cipher.derived_key())),
    }
}

pub fn parse(reference: &ReferenceArgs, json: bool) -> Result<()> {
    let output = parse_output(&reference.raw()?);

    if json {
        return print_json(&output);
    }
    println!("index:       {}", output.index);
    println!("key:         {:016x}", output.key);
    if let Some(derived) = &output.derived_key {
        println!("derived key: {derived}");
    }
    Ok(())
}

struct Source {
    metadata: Arc<StaticMetadata>,
    store: Arc<DirectoryContentStore>,
    config: DecoderConfig,
    language: LanguageId,
}

fn open_source(args: &SourceArgs) -> Result<Source> {
    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => DecoderConfig::default(),
    };

    let metadata = Arc::new(
        StaticMetadata::from_path(&args.layout)
            .with_context(|| format!("loading layout {}", args.layout.display()))?,
    );
    let language = args
        .language
        .map_or_else(|| metadata.current_language(), LanguageId);
    debug!("Using language {language} from {}", args.root.display());

    Ok(Source {
        store: Arc::new(DirectoryContentStore::new(&args.root)),
        metadata,
        config,
        language,
    })
}

pub fn decode(reference: &ReferenceArgs, source: &SourceArgs, json: bool) -> Result<()> {
    let raw = reference.raw()?;
    let Source {
        metadata,
        store,
        config,
        language,
    } = open_source(source)?;
    let decoder = StringDecoder::with_config(store, metadata, config)?;

    let summary = decoder.load_language(language)?;
    info!(
        "Loaded {} records for language {language} ({} slots skipped)",
        summary.records, summary.skipped_slots
    );

    let mut text = String::new();
    for _ in 0..DECODE_POLLS {
        text = decoder.decode(&raw, Some(language));
        if !text.is_empty() {
            break;
        }
        decoder.wait_idle()?;
    }
    if text.is_empty() {
        text = decoder.decode(&raw, Some(language));
    }

    let parsed = parse_reference(&raw);
    if json {
        return print_json(&DecodeOutput {
            language,
            index: parsed.index,
            key: parsed.key,
            text,
        });
    }
    if text.is_empty() {
        anyhow::bail!("no text for {parsed}");
    }
    println!("{text}");
    Ok(())
}

pub fn dump(source: &SourceArgs, start: u64, limit: usize, json: bool) -> Result<()> {
    let Source {
        metadata,
        store,
        config,
        language,
    } = open_source(source)?;
    config.validate()?;

    let layout = metadata.language_layout(language).with_context(|| {
        let known: Vec<String> = metadata.languages().iter().map(ToString::to_string).collect();
        format!(
            "no layout for language {language} (manifest has: {})",
            known.join(", ")
        )
    })?;
    let table = StringTable::load(language, &layout, store.as_ref(), config.record_limits());
    let rows = dump_rows(&table, start, limit);

    if json {
        return print_json(&rows);
    }
    for row in &rows {
        println!(
            "{:>8}  {:>5}  base={:#06x}  bits={:>2}  {}",
            row.index,
            row.size,
            row.base_char,
            row.bits_per_char,
            row.preview.as_deref().unwrap_or("<unreadable>")
        );
    }
    println!("{} of {} records", rows.len(), table.len());
    Ok(())
}

/// Rows for records at or after `start`, in index order.
///
/// Previews assume the record is stored in plain text; encrypted records
/// show up garbled or unreadable.
fn dump_rows(table: &StringTable, start: u64, limit: usize) -> Vec<DumpRow> {
    let unpacker = RecordUnpacker::new();
    let mut indices: Vec<u64> = table
        .iter()
        .map(|(index, _)| index)
        .filter(|&index| index >= start)
        .collect();
    indices.sort_unstable();

    indices
        .into_iter()
        .take(limit)
        .filter_map(|index| {
            let record = table.get(index)?;
            let header = record.header().ok()?;
            Some(DumpRow {
                index,
                size: record.len(),
                base_char: header.base_char,
                bits_per_char: header.bits_per_char,
                preview: unpacker
                    .unpack(record)
                    .map(|text| postprocess::process(&text)),
            })
        })
        .collect()
}

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, ErrorKind, Parser, Subcommand};

use reeltrust::evidence::EvidenceExtractorConfig;
use reeltrust::media::RecompressParams;
use reeltrust::package::metadata::{GpsCoords, MetadataOptions};
use reeltrust::sign::{Signer, SignerConfig};
use reeltrust::verify::{VerificationPolicy, Verifier, VerifierConfig};

#[derive(Debug, Subcommand)]
enum Commands {
    #[clap(after_help = "Displays info about reeltrust and its dependencies.")]
    Info,

    #[clap(
        arg_required_else_help = true,
        after_help = "Signs a source video, producing a verification package directory alongside it."
    )]
    Sign {
        #[clap(value_parser = clap::value_parser!(PathBuf), help = "Path to the original source video.")]
        source: PathBuf,

        #[clap(value_parser = clap::value_parser!(PathBuf), help = "Directory to write the package into.")]
        package_dir: PathBuf,

        #[clap(
            long,
            default_value_t = reeltrust::DEFAULT_DIGEST_WIDTH,
            help = "Target width, in pixels, of the reference digest."
        )]
        digest_width: u32,

        #[clap(
            long,
            default_value_t = reeltrust::DEFAULT_DIGEST_CRF,
            help = "Constant rate factor used when recompressing the reference digest."
        )]
        digest_crf: u32,

        #[clap(
            long,
            default_value = reeltrust::DEFAULT_DIGEST_PRESET,
            help = "x264 preset used when recompressing the reference digest."
        )]
        digest_preset: String,

        #[clap(long, help = "Optional user identity to embed in metadata.json.")]
        user_identity: Option<String>,

        #[clap(long, requires = "gps_lon", help = "Optional GPS latitude to embed in metadata.json.")]
        gps_lat: Option<f64>,

        #[clap(long, requires = "gps_lat", help = "Optional GPS longitude to embed in metadata.json.")]
        gps_lon: Option<f64>,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Fan the three fingerprint passes out across a thread pool instead of running sequentially."
        )]
        parallel_fingerprints: bool,
    },

    #[clap(
        arg_required_else_help = true,
        after_help = "Verifies a candidate video against a previously signed package."
    )]
    Verify {
        #[clap(value_parser = clap::value_parser!(PathBuf), help = "Path to the candidate video.")]
        candidate: PathBuf,

        #[clap(value_parser = clap::value_parser!(PathBuf), help = "Path to the package directory.")]
        package_dir: PathBuf,

        #[clap(
            long,
            default_value_t = reeltrust::DEFAULT_SSIM_THRESHOLD_VERIFY,
            help = "Worst-window mean SSIM at or above which the SSIM check passes."
        )]
        ssim_threshold: f64,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Also require at least one fingerprint verdict (dHash, pHash, or stats) to pass, not just SSIM."
        )]
        require_fingerprint_agreement: bool,

        #[clap(
            long,
            value_parser = clap::value_parser!(PathBuf),
            help = "If set, render audit clips for any flagged windows into this directory."
        )]
        evidence_dir: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(
        long,
        global = true,
        default_value = "false",
        action(ArgAction::SetTrue),
        help = "Skip the cheap file-header video check before invoking FFmpeg."
    )]
    skip_header_check: bool,
}

impl Cli {
    fn check_input_looks_like_video(&self, path: &PathBuf) {
        if self.skip_header_check {
            return;
        }
        if !reeltrust::util::looks_like_video(path) {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::InvalidValue,
                format!("{} does not look like a video file", path.display()),
            )
            .exit();
        }
    }
}

fn main() -> reeltrust::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    ffmpeg_next::init().unwrap();
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Fatal);

    let args = Cli::parse();

    match &args.command {
        Commands::Info => {
            println!("reeltrust {}", env!("CARGO_PKG_VERSION"));
            println!("FFmpeg version: {}", reeltrust::util::ffmpeg_version_string());
        }

        Commands::Sign {
            source,
            package_dir,
            digest_width,
            digest_crf,
            digest_preset,
            user_identity,
            gps_lat,
            gps_lon,
            parallel_fingerprints,
        } => {
            args.check_input_looks_like_video(source);

            let gps = match (gps_lat, gps_lon) {
                (Some(lat), Some(lon)) => Some(GpsCoords { lat: *lat, lon: *lon }),
                _ => None,
            };
            let config = SignerConfig::default()
                .with_recompress(RecompressParams {
                    width: *digest_width,
                    crf: *digest_crf,
                    preset: digest_preset.clone(),
                })
                .with_metadata_options(MetadataOptions {
                    user_identity: user_identity.clone(),
                    gps,
                    additional_info: None,
                })
                .with_parallel_fingerprints(*parallel_fingerprints);

            let signer = Signer::new(config);
            let package = signer.sign(source, package_dir)?;
            println!("package id: {}", package.package_id);
            println!("package written to: {}", package.package_dir.display());
        }

        Commands::Verify {
            candidate,
            package_dir,
            ssim_threshold,
            require_fingerprint_agreement,
            evidence_dir,
        } => {
            args.check_input_looks_like_video(candidate);

            let policy = if *require_fingerprint_agreement {
                VerificationPolicy::SsimAndAnyFingerprint
            } else {
                VerificationPolicy::SsimOnly
            };
            let mut config = VerifierConfig::default()
                .with_policy(policy)
                .with_evidence(EvidenceExtractorConfig::default());
            config.ssim.threshold = *ssim_threshold;
            if let Some(dir) = evidence_dir {
                config = config.with_evidence_dir(dir.clone());
            }

            let verifier = Verifier::new(config);
            let result = verifier.verify(candidate, package_dir)?;

            println!("is_valid: {}", result.is_valid);
            println!("  package_structure:  {}", result.package_structure);
            println!("  manifest_integrity: {}", result.manifest_integrity);
            println!("  frame_count_match:  {}", result.frame_count_match);
            println!("  digest_hash_match:  {}", result.digest_hash_match);
            if let Some(ssim) = &result.ssim {
                println!("  ssim: worst={:.4} threshold={:.4} valid={}", ssim.worst_window_metric, ssim.threshold, ssim.is_valid);
            }
            if let Some(dhash) = &result.dhash {
                println!("  dhash: worst={:.2} bits valid={}", dhash.worst_window_metric, dhash.is_valid);
            }
            if let Some(phash) = &result.phash {
                println!("  phash: worst={:.2} bits valid={}", phash.worst_window_metric, phash.is_valid);
            }
            if let Some(stats) = &result.stats {
                println!(
                    "  frame_stats: worst_correlation={:.4} worst_mad={:.4} valid={}",
                    stats.worst_correlation, stats.worst_mad, stats.is_valid
                );
            }
            if !result.audit_clips.is_empty() {
                println!("  audit clips:");
                for clip in &result.audit_clips {
                    println!("    [{:.1}s, {:.1}s]", clip.start_time_s, clip.end_time_s);
                }
            }
            for err in &result.errors {
                println!("  error: {err}");
            }

            std::process::exit(if result.is_valid { 0 } else { 1 });
        }
    }

    Ok(())
}

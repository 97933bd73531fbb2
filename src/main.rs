use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use sales_voice_coach::config::LoadOptions;
use sales_voice_coach::voice::{AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, calculate_energy};
use sales_voice_coach::{
    AzureOpenAiChat, AzureSpeech, Config, ConversationSession, CustomerProfile,
    RecognitionMode, RecognitionOrchestrator, ResponseDispatcher, SpeechSynthesizer,
};

/// Voice Coach - spoken sales role-play against a simulated customer
#[derive(Parser)]
#[command(name = "voicecoach", version, about)]
struct Cli {
    /// Customer profile to simulate
    #[arg(short, long, value_enum)]
    profile: Option<CustomerProfile>,

    /// Recognition mode
    #[arg(short, long, value_enum)]
    mode: Option<RecognitionMode>,

    /// Only transcribe speech; no chat backend, no spoken replies
    #[arg(long)]
    transcribe_only: bool,

    /// Config file (defaults to ~/.config/omni/voicecoach/config.toml)
    #[arg(short, long, env = "VOICECOACH_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hi, I am Mr. Wiggins and I might be interested in a possible insurance.")]
        text: String,
    },
    /// Print every customer profile and its preamble
    Profiles,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sales_voice_coach=info",
        1 => "info,sales_voice_coach=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(cli.config, &text).await,
            Command::Profiles => {
                print_profiles();
                Ok(())
            }
        };
    }

    let options = LoadOptions {
        config_path: cli.config,
        profile: cli.profile,
        mode: cli.mode,
        transcribe_only: cli.transcribe_only,
    };
    let config = Config::load(&options)?;
    tracing::debug!(?config, "loaded configuration");

    let conversation = &config.conversation;
    tracing::info!(
        profile = %conversation.profile,
        mode = %conversation.mode,
        stop_phrase = %conversation.stop_phrase,
        "starting voice coach"
    );

    let speech = Arc::new(AzureSpeech::new(&config.speech));

    let dispatcher = config.chat.as_ref().map(|chat| {
        ResponseDispatcher::new(Arc::new(AzureOpenAiChat::new(chat)), speech.clone())
    });

    let session = ConversationSession::new(conversation.profile.preamble(), conversation.max_tokens);

    // Ctrl-C ends the conversation
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            let _ = shutdown_tx.send(()).await;
        }
    });

    let mut orchestrator =
        RecognitionOrchestrator::new(session, conversation.stop_policy(), dispatcher)
            .with_shutdown(shutdown_rx);

    tracing::info!("voice coach ready - say \"start\" to begin the call");
    let termination = orchestrator.run(conversation.mode, speech.as_ref()).await?;

    let session = orchestrator.into_session();
    tracing::info!(
        reason = %termination,
        turns = session.exchanged().len(),
        "conversation ended"
    );

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    // cpal streams are not Send, keep the capture on a blocking thread
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        println!("Sample rate: {} Hz", capture.sample_rate());
        println!("---");

        for i in 0..duration {
            std::thread::sleep(Duration::from_secs(1));

            let samples = capture.take_buffer();
            let energy = calculate_energy(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

            println!(
                "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
                i + 1,
                energy,
                peak,
                meter
            );
        }

        capture.stop();
        Ok(())
    })
    .await??;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    let num_samples = PLAYBACK_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...", samples.len());

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_blocking(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test speech synthesis through the configured voice
async fn test_tts(config_path: Option<std::path::PathBuf>, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load(&LoadOptions {
        config_path,
        transcribe_only: true,
        ..LoadOptions::default()
    })?;

    println!("Voice: {}", config.speech.voice);
    println!("Synthesizing speech...");

    let speech = AzureSpeech::new(&config.speech);
    let result = speech.synthesize(text).await?;
    println!("Played {} bytes of audio", result.audio_bytes);

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Print every profile's preamble
fn print_profiles() {
    for profile in CustomerProfile::ALL {
        println!("{profile}");
        for turn in profile.preamble() {
            println!("  [{}] {}", turn.role, turn.content);
        }
        println!();
    }
}

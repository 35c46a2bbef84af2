use maek::{Maek, RuleOptions};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "maek",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "A small, parallel, content-addressed build engine"
)]
struct Opts {
    /// Targets to bring up to date.
    #[structopt(name = "TARGET")]
    targets: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::from_args();

    let maek = Maek::host()?;

    // The sample game build: four translation units, a shipping binary,
    // and a test binary that reuses everything but game.o.
    let player = maek.cpp("Player.cpp", None, RuleOptions::default())?;
    let level = maek.cpp("Level.cpp", None, RuleOptions::default())?;
    let game = maek.cpp("game.cpp", None, RuleOptions::default())?;
    let test = maek.cpp("test.cpp", None, RuleOptions::default())?;

    let _game_exe = maek.link(
        vec![player.clone(), level.clone(), game],
        "dist/game",
        RuleOptions::default(),
    )?;
    let test_exe = maek.link(
        vec![player, level, test],
        "test/game-test",
        RuleOptions::default(),
    )?;

    maek.rule(
        [":test"],
        [test_exe.as_str()],
        vec![vec![test_exe.clone(), "--all-tests".to_string()]],
    )?;

    let targets = if opts.targets.is_empty() {
        vec![":dist".to_string()]
    } else {
        opts.targets
    };

    let ok = maek.update(targets).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

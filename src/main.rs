use project_bundler::cli::commands::run;

fn main() -> anyhow::Result<()> {
    run()
}

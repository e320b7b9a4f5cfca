fn main() -> anyhow::Result<()> {
    resttree::cli::run_cli()
}

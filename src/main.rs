fn main() -> Result<(), Box<dyn std::error::Error>> {
    seqopt::cli::main()
}

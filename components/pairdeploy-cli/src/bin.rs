fn main() {
    pairdeploy_lib::frontend::cli::main();
}

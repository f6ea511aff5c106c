fn main() {
    sas_lineage::cli::run();
}

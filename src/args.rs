use datastash::store;

#[derive(clap::Args, Clone, Debug)]
pub struct CommonArgs {
    /// URI of the document store: the directory holding its database files.
    ///
    /// If not present tries to read the environment variable
    /// `DATASTASH_STORE_URI`.
    #[arg(id = "store-uri", long = "store-uri", env = "DATASTASH_STORE_URI")]
    store_uri: String,

    /// Name of the target database within the store.
    ///
    /// If not present tries to read the environment variable
    /// `DATASTASH_DATABASE`.
    #[arg(id = "database", long = "database", env = "DATASTASH_DATABASE")]
    database: String,
}

#[derive(clap::Args, Clone, Debug)]
pub struct JsonOutputArg {
    /// Print the import summary to stdout as JSON. By default nothing is
    /// printed on success besides the logs.
    #[arg(id = "json", long = "json", default_value_t = false)]
    pub value: bool,
}

impl CommonArgs {
    pub fn store_options(&self) -> store::Options {
        store::Options {
            uri: self.store_uri.clone(),
            database: self.database.clone(),
        }
    }
}

pub mod core;
pub mod schema;
pub mod mapping;
pub mod query;
pub mod analysis;
pub mod store;
pub mod yard;
pub mod site;
pub mod directory;

pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{Representation, Text, Value};

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                              ENTITYHUB ARCHITECTURE                                   │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── FEDERATION LAYER ────────────────────────────────────┐
│                                                                                       │
│  ┌──────────────────────────────────────────────────────────────────────────────┐   │
│  │                            struct SiteManager                                  │   │
│  │  registry: RwLock<Registry>      // sites, prefix routing table               │   │
│  │  find / find_ids / find_entities // rayon fan-out, first site wins            │   │
│  └──────────────────────────────────────┬───────────────────────────────────────┘   │
│                                         │ 1..n                                       │
│  ┌──────────────────────────────────────▼───────────────────────────────────────┐   │
│  │                           struct ReferencedSite                                │   │
│  │  config: SiteConfiguration       // CacheStrategy none | used | all           │   │
│  │  backends: RwLock<SiteBackends>  // swapped by reconfigure(select_backend)    │   │
│  │     ├─ cache: Arc<dyn Yard>                                                   │   │
│  │     ├─ dereferencer: Arc<dyn EntityDereferencer>                              │   │
│  │     └─ searcher: Arc<dyn EntitySearcher>                                      │   │
│  └──────────────────────────────────────┬───────────────────────────────────────┘   │
└─────────────────────────────────────────┼────────────────────────────────────────────┘
                                          │ cache
┌──────────────────────────────── YARD LAYER ──────────▼───────────────────────────────┐
│                                                                                       │
│  ┌──────────────────────────────────────────────────────────────────────────────┐   │
│  │                              struct IndexYard                                  │   │
│  │  config: YardConfig              // domain, boosts, commit policy, limits     │   │
│  │  store: Arc<dyn DocumentStore>   // black-box index client                    │   │
│  │  mapper: Arc<FieldMapper>        // IndexField <-> physical field names       │   │
│  │  value_factory: Arc<IndexValueFactory>                                        │   │
│  │  compiler: QueryCompiler         // FieldQuery -> store query string          │   │
│  └───────────────┬──────────────────────────┬───────────────────────┬───────────┘   │
└──────────────────┼──────────────────────────┼───────────────────────┼────────────────┘
                   │                          │                       │
┌──────────────────▼─────────┐ ┌──────────────▼─────────────┐ ┌───────▼────────────────┐
│       MAPPING LAYER        │ │        QUERY LAYER         │ │      SCHEMA LAYER      │
│                            │ │                            │ │                        │
│ FieldMapper                │ │ QueryCompiler              │ │ IndexField             │
│  prefixes: NamespacePrefix │ │  constraint::IndexConstr.. │ │  path, data_type,      │
│            Table (lazy     │ │  encoders: value -> terms  │ │  languages             │
│            load, persisted │ │  as-executed FieldQuery    │ │ IndexValueFactory      │
│            in the store)   │ │  QueryResultList<T>        │ │  TypeConverter per     │
│  field_names: MappingCache │ │                            │ │  ValueKind             │
│  index_fields: MappingCache│ │                            │ │ IndexDataType registry │
└────────────────────────────┘ └────────────────────────────┘ └────────────────────────┘

┌───────────────────────────────── STORE LAYER ────────────────────────────────────────┐
│                                                                                       │
│  trait DocumentStore: add / delete_by_ids / delete_by_query / query / commit          │
│                                                                                       │
│  struct MemoryStore (in-process implementation)                                       │
│    parser: QueryParser (nom)  ──►  Query AST  ──►  DocumentMatcher (scores)          │
│    schema: StoreSchema         // field types, copy fields, Analyzer for text        │
│    state: RwLock<StoreState>   // committed docs + pending ops, commit_within        │
└───────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────── DIRECTORY LAYER ────────────────────────────────────┐
│                                                                                       │
│  struct IndexDirectoryManager                                                         │
│    provider: Arc<dyn DataFileProvider>   // archives by name                         │
│    pending: PendingIndexRegistry         // <root>/.config/uninitialised-index       │
│    initializing: Mutex<HashSet<String>> + Condvar   // one initialiser per index      │
│                                                                                       │
│    archive (zip | tar.gz | tar.bz2 | .ref) ──extract──► .staging ──rename──► <root>/x │
└───────────────────────────────────────────────────────────────────────────────────────┘

Write path:   Representation ─► IndexValueFactory ─► FieldMapper ─► InputDocument ─► store
Query path:   FieldQuery ─► QueryCompiler ─► StoreQuery ─► store ─► StoredDocument
              ─► FieldMapper (decode) ─► Representation ─► QueryResultList + executed query
*/

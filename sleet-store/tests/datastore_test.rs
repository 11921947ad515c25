//! End-to-end datastore tests against a mock discovery server and
//! mirror: tracking, full update cycles, snapshots, retrieval by path,
//! and reachability-based eviction across a build transition.

use std::str::FromStr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use blte::{CompressionMode, encode};
use sleet_client::CdnClient;
use sleet_parser::testutil;
use sleet_parser::{FileList, FileMeta, RootParser};
use sleet_store::Datastore;
use sleet_types::{CdnHash, ContentHash, ProgramCode, Region};

/// Decodes the test root manifest: one `path|hex|size` line per file.
struct LineManifestParser;

impl RootParser for LineManifestParser {
    fn file_list(&self, data: &[u8]) -> sleet_parser::Result<FileList> {
        let text = String::from_utf8_lossy(data);
        let mut files = FileList::new();
        for (id, line) in text.lines().enumerate() {
            let mut cells = line.split('|');
            let (Some(path), Some(hash), Some(size)) =
                (cells.next(), cells.next(), cells.next())
            else {
                continue;
            };
            files.insert(
                path.to_string(),
                FileMeta {
                    content_hash: ContentHash::from_str(hash)
                        .map_err(|_| sleet_parser::Error::EmptyFilename)?,
                    size: size.parse().unwrap_or(0),
                    locale_flags: 0,
                    file_id: id as u32,
                },
            );
        }
        Ok(files)
    }
}

/// Hashes and bodies for one deployed build.
struct BuildFixture {
    build_config: CdnHash,
    cdn_config: CdnHash,
    build_id: u32,
    versions_name: String,
}

const ROOT_CONTENT: &str = "5a2aa0bb187beff1a846cf89dcda6a41";
const FILE_CONTENT: &str = "cafebeef000000000000000000000000";
const FILE_CDN: &str = "feedbe11000000000000000000000000";
const ARCHIVE: &str = "ac0000000000000000000000000000aa";

fn object_path(kind: &str, hash: &str, suffix: &str) -> String {
    format!("/tpr/test/{kind}/{}/{}/{hash}{suffix}", &hash[0..2], &hash[2..4])
}

/// Mount every endpoint one build needs: discovery tables, configs,
/// encoding blob, archive index, root manifest and one data file.
async fn mount_build(server: &MockServer, fixture: &BuildFixture) {
    let host = server.uri().strip_prefix("http://").unwrap().to_string();

    let cdns = format!(
        "Name!STRING:0|Path!STRING:0|Hosts!STRING:0|ConfigPath!STRING:0\n\
         eu|tpr/test|{host}|tpr/configs/data\n"
    );
    let versions = format!(
        "Region!STRING:0|BuildConfig!HEX:16|CDNConfig!HEX:16|KeyRing!HEX:16|BuildId!DEC:4|VersionsName!String:0|ProductConfig!HEX:16\n\
         eu|{}|{}||{}|{}|530fa1f1003300330033003300330033\n",
        fixture.build_config, fixture.cdn_config, fixture.build_id, fixture.versions_name,
    );

    Mock::given(method("GET"))
        .and(path("/herot/cdns"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cdns))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/herot/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(versions))
        .mount(server)
        .await;

    // The encoding blob is keyed per build so each build gets its own
    // CDN hash for it; derive it from the build config hash.
    let encoding_cdn = {
        let mut bytes = *fixture.build_config.as_bytes();
        bytes[15] ^= 0xee;
        CdnHash::new(bytes)
    };
    let root_cdn = {
        let mut bytes = *fixture.build_config.as_bytes();
        bytes[15] ^= 0x11;
        CdnHash::new(bytes)
    };

    let build_config_text = format!(
        "# Build Configuration\n\
         root = {ROOT_CONTENT}\n\
         encoding = e0e1f0f1000000000000000000008d8f {encoding_cdn}\n\
         encoding-size = 44979819 44930354\n"
    );
    let cdn_config_text = format!("archives = {ARCHIVE}\n");

    Mock::given(method("GET"))
        .and(path(object_path(
            "config",
            &fixture.build_config.to_string(),
            "",
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_config_text))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(object_path(
            "config",
            &fixture.cdn_config.to_string(),
            "",
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string(cdn_config_text))
        .mount(server)
        .await;

    let table = testutil::encoding_table(&[
        (
            ContentHash::from_str(ROOT_CONTENT).unwrap(),
            vec![root_cdn],
        ),
        (
            ContentHash::from_str(FILE_CONTENT).unwrap(),
            vec![CdnHash::from_str(FILE_CDN).unwrap()],
        ),
    ]);
    Mock::given(method("GET"))
        .and(path(object_path("data", &encoding_cdn.to_string(), "")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(encode::encode_single(&table, CompressionMode::ZLib)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(object_path("data", ARCHIVE, ".index")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(testutil::archive_index(&[])))
        .mount(server)
        .await;

    let manifest = format!("Base/GameData/Hero.xml|{FILE_CONTENT}|7\n");
    Mock::given(method("GET"))
        .and(path(object_path("data", &root_cdn.to_string(), "")))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(encode::encode_single(
                manifest.as_bytes(),
                CompressionMode::None,
            )),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(object_path("data", FILE_CDN, "")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(encode::encode_single(b"hooray!", CompressionMode::None)),
        )
        .mount(server)
        .await;
}

fn fixture_b1() -> BuildFixture {
    BuildFixture {
        build_config: CdnHash::from_str("ffbbf430001122334455667788997569").unwrap(),
        cdn_config: CdnHash::from_str("ffbec78200112233445566778899ba9c").unwrap(),
        build_id: 52008,
        versions_name: "24.3.52008".to_string(),
    }
}

fn fixture_b2() -> BuildFixture {
    BuildFixture {
        build_config: CdnHash::from_str("aa01b430001122334455667788990001").unwrap(),
        cdn_config: CdnHash::from_str("aa02c78200112233445566778899ba02").unwrap(),
        build_id: 52100,
        versions_name: "24.4.52100".to_string(),
    }
}

fn datastore(server: &MockServer) -> Datastore {
    let client = CdnClient::builder()
        .patch_base(server.uri())
        .build()
        .unwrap();
    Datastore::new(client, Arc::new(LineManifestParser))
}

#[tokio::test]
async fn test_update_builds_full_snapshot() {
    let server = MockServer::start().await;
    mount_build(&server, &fixture_b1()).await;

    let ds = datastore(&server);
    ds.track(Region::from("eu"), ProgramCode::from("herot"));

    let cancel = CancellationToken::new();
    ds.update(&cancel).await.unwrap();

    let snapshot = ds
        .client(&Region::from("eu"), &ProgramCode::from("herot"))
        .unwrap();
    assert_eq!(snapshot.version.build_id, 52008);
    assert_eq!(
        snapshot.version.build_config,
        fixture_b1().build_config
    );
    assert_eq!(
        snapshot.build_config.encoding.content_hash.to_string(),
        "e0e1f0f1000000000000000000008d8f"
    );
    assert_eq!(snapshot.encoding.len(), 2);

    // Retrieval by path flows through the whole pipeline.
    let mut stream = snapshot
        .resolve_path("base/gamedata/HERO.XML", &cancel)
        .await
        .unwrap();
    assert_eq!(stream.read_to_end().await.unwrap(), b"hooray!");

    let stats = ds.stats();
    assert_eq!(stats.build_configs, 1);
    assert_eq!(stats.encoding_mappers, 1);
    assert_eq!(stats.filename_mappers, 1);
    assert_eq!(stats.archive_mappers, 1);
}

#[tokio::test]
async fn test_second_update_reuses_cached_artifacts() {
    let server = MockServer::start().await;
    mount_build(&server, &fixture_b1()).await;

    let ds = datastore(&server);
    ds.track(Region::from("eu"), ProgramCode::from("herot"));

    let cancel = CancellationToken::new();
    ds.update(&cancel).await.unwrap();
    ds.update(&cancel).await.unwrap();

    let stats = ds.stats();
    assert_eq!(stats.build_configs, 1);
    assert_eq!(stats.encoding_mappers, 1);
}

#[tokio::test]
async fn test_build_transition_evicts_unreachable_artifacts() {
    let server = MockServer::start().await;
    mount_build(&server, &fixture_b1()).await;

    let ds = datastore(&server);
    ds.track(Region::from("eu"), ProgramCode::from("herot"));

    let cancel = CancellationToken::new();
    ds.update(&cancel).await.unwrap();

    // Hold a snapshot of the old build across the transition.
    let old_snapshot = ds
        .client(&Region::from("eu"), &ProgramCode::from("herot"))
        .unwrap();

    // The deployment moves to B2: same endpoints, new hashes.
    server.reset().await;
    mount_build(&server, &fixture_b2()).await;

    ds.update(&cancel).await.unwrap();

    // Exactly one build's artifacts remain cached; B1's were evicted.
    let stats = ds.stats();
    assert_eq!(stats.build_configs, 1);
    assert_eq!(stats.cdn_configs, 1);
    assert_eq!(stats.encoding_mappers, 1);
    assert_eq!(stats.filename_mappers, 1);
    assert_eq!(stats.archive_mappers, 1);

    let snapshot = ds
        .client(&Region::from("eu"), &ProgramCode::from("herot"))
        .unwrap();
    assert_eq!(snapshot.version.build_id, 52100);
    assert_eq!(snapshot.version.build_config, fixture_b2().build_config);

    // The old snapshot's handles survive eviction.
    assert_eq!(old_snapshot.version.build_id, 52008);
    assert_eq!(old_snapshot.encoding.len(), 2);
    assert!(
        old_snapshot
            .encoding
            .lookup(&ContentHash::from_str(FILE_CONTENT).unwrap())
            .is_ok()
    );
}

#[tokio::test]
async fn test_partial_failure_does_not_abort_other_pairs() {
    let server = MockServer::start().await;
    mount_build(&server, &fixture_b1()).await;

    let ds = datastore(&server);
    // "xx" has no row in either table, so its update fails; "eu" must
    // still complete.
    ds.track(Region::from("xx"), ProgramCode::from("herot"));
    ds.track(Region::from("eu"), ProgramCode::from("herot"));

    let cancel = CancellationToken::new();
    let err = ds.update(&cancel).await.unwrap_err();
    assert!(matches!(
        err,
        sleet_store::Error::Client(sleet_client::Error::UnknownRegion { .. })
    ));

    assert!(
        ds.client(&Region::from("eu"), &ProgramCode::from("herot"))
            .is_ok()
    );
    assert!(
        ds.client(&Region::from("xx"), &ProgramCode::from("herot"))
            .is_err()
    );
}

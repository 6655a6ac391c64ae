use salesbro::csv_loader::{DataSource, DatasetCache};
use salesbro::csv_reporter::{run, ReportResult};
use salesbro::errors::LoadError;
use salesbro::sales_data::Field;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

const HEADER: &str = "Row ID,Order ID,Order Date,Ship Date,Ship Mode,Customer ID,Customer Name,Segment,Country,City,State,Postal Code,Region,Product ID,Category,Sub-Category,Product Name,Sales,Quantity,Discount,Profit";

fn superstore_bytes() -> Vec<u8> {
    let mut text = String::from(HEADER);
    text.push('\n');
    text.push_str("1,CA-2016-152156,11/8/2016,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States,Henderson,Kentucky,42420,South,FUR-BO-10001798,Furniture,Bookcases,Bush Somerset Collection Bookcase,261.96,2,0,41.9136\n");
    text.push_str("2,CA-2016-152156,11/8/2016,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States,Henderson,Kentucky,42420,South,FUR-CH-10000454,Furniture,Chairs,\"Hon Deluxe Fabric Upholstered Stacking Chairs, Rounded Back\",731.94,3,0,219.582\n");
    text.push_str("3,CA-2016-138688,not a date,6/16/2016,Second Class,DV-13045,Darrin Van Huff,Corporate,United States,Los Angeles,California,90036,West,OFF-LA-10000240,Office Supplies,Labels,Self-Adhesive Address Labels,14.62,2,0,6.8714\n");
    text.push_str("4,US-2015-108966,2015-10-11,10/18/2015,Standard Class,SO-20335,Sean O'Donnell,Consumer,United States,Fort Lauderdale,Florida,33311,South,FUR-TA-10000577,Furniture,Tables,Bretford CR4500 Series Slim Rectangular Table,957.5775,5,0.45,-383.031\n");
    text.push_str("5,US-2015-108966,10/11/2015,10/18/2015,Standard Class\n");

    let mut bytes = text.into_bytes();
    // A Latin-1 product name, as the public file ships it.
    bytes.extend_from_slice(b"6,CA-2014-115812,6/9/2014,6/14/2014,Standard Class,BH-11710,Brosina Hoffman,Consumer,United States,Los Angeles,California,90032,West,TEC-PH-10002033,Technology,Phones,Caf\xe9 Phone,907.152,6,0.2,90.7152\n");
    bytes
}

#[tokio::test]
async fn keeps_every_row_with_a_usable_date() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("superstore.csv");
    fs::write(&path, superstore_bytes()).unwrap();
    let source = DataSource::Path(path);

    let mut cache = DatasetCache::new();
    let dataset = cache.load(&source).await.unwrap();

    // Six data rows: one bad date and one truncated row are dropped.
    assert_eq!(dataset.len(), 4);
    let report = cache.report(&source).unwrap();
    assert_eq!(report.rows_read, 6);
    assert_eq!(report.dropped_bad_date, 1);
    assert_eq!(report.dropped_malformed, 1);

    let names: Vec<&str> = dataset
        .records()
        .iter()
        .map(|r| r.product_name.as_str())
        .collect();
    assert!(names.contains(&"Café Phone"));
    assert!(names.contains(&"Hon Deluxe Fabric Upholstered Stacking Chairs, Rounded Back"));
    assert!(!dataset.has_column(Field::Salesperson));
}

#[tokio::test]
async fn second_load_is_served_from_memory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("superstore.csv");
    fs::write(&path, superstore_bytes()).unwrap();
    let source = DataSource::Path(path.clone());

    let mut cache = DatasetCache::new();
    let first = cache.load(&source).await.unwrap();
    fs::remove_file(&path).unwrap();
    let second = cache.load(&source).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn one_file_under_two_spellings_is_loaded_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("superstore.csv");
    fs::write(&path, superstore_bytes()).unwrap();
    let dir_name = dir.path().file_name().unwrap();
    let roundabout = dir.path().join("..").join(dir_name).join("superstore.csv");

    let plain = DataSource::parse(path.to_str().unwrap());
    let other = DataSource::parse(roundabout.to_str().unwrap());
    assert_eq!(plain.id(), other.id());

    let mut cache = DatasetCache::new();
    let first = cache.load(&plain).await.unwrap();
    let second = cache.load(&other).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn invalidated_sources_are_read_again() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("superstore.csv");
    fs::write(&path, superstore_bytes()).unwrap();
    let source = DataSource::Path(path.clone());

    let mut cache = DatasetCache::new();
    cache.load(&source).await.unwrap();
    fs::remove_file(&path).unwrap();

    assert!(cache.invalidate(&source));
    assert!(!cache.invalidate(&source));
    assert!(matches!(
        cache.load(&source).await,
        Err(LoadError::Io { .. })
    ));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn missing_file_is_an_io_error_naming_the_source() {
    let dir = tempdir().unwrap();
    let source = DataSource::Path(dir.path().join("nope.csv"));
    let err = DatasetCache::new().load(&source).await.unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("nope.csv"));
}

#[tokio::test]
async fn header_without_order_date_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no_dates.csv");
    fs::write(&path, "Category,Sales\nFurniture,10\n").unwrap();
    let err = DatasetCache::new()
        .load(&DataSource::Path(path))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Order Date"));
}

#[tokio::test]
async fn blank_measures_keep_the_row_in_every_total() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gaps.csv");
    fs::write(
        &path,
        "Order ID,Order Date,Category,Sales,Quantity,Discount,Profit\n\
         CA-1,11/8/2016,Furniture,100,2,0,10\n\
         CA-2,11/9/2016,Furniture,50,1,,5\n\
         CA-3,11/10/2016,Technology,200,1,0.2,40\n",
    )
    .unwrap();
    let source = DataSource::Path(path);

    let mut cache = DatasetCache::new();
    let dataset = cache.load(&source).await.unwrap();
    assert_eq!(dataset.len(), 3);
    assert_eq!(cache.report(&source).unwrap().dropped_malformed, 0);

    let by_category = match run(&dataset, "Q1").unwrap() {
        ReportResult::Series(series) => series,
        other => panic!("expected a series, got {:?}", other),
    };
    assert_eq!(by_category.value_of(&["Furniture"]), Some(150.0));
    assert_eq!(by_category.value_of(&["Technology"]), Some(200.0));
}

// ==========================================
// 其他费用重分摊引擎集成测试
// ==========================================
// 测试目标: 验证 RedistributionEngine + InvoiceRepository 端到端行为
// 覆盖范围: 候选阈值、试算不写库、提交写入、单发票事务、MD 库选择、分批与截断
// ==========================================


use erp_backoffice::config::SchemaSettings;
use erp_backoffice::engine::redistribution::{LINE_FETCH_CHUNK, MAX_CHANGES};
use erp_backoffice::engine::{RedistributionEngine, RedistributionError, RedistributionRequest};
use erp_backoffice::repository::{InvoiceRepository, RepositoryError};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::{query_f64, query_i64};

// ==========================================
// 测试辅助函数
// ==========================================

fn request(action: &str, dry_run: bool) -> RedistributionRequest {
    RedistributionRequest {
        action: action.to_string(),
        start_date: "2024-05-01".to_string(),
        end_date: "2024-05-31".to_string(),
        dry_run,
    }
}

fn seeded() -> (Arc<Mutex<Connection>>, RedistributionEngine<InvoiceRepository>) {
    let conn = test_helpers::create_erp_connection().unwrap();
    test_helpers::seed_redistribution_scenario(&conn).unwrap();
    let conn = test_helpers::shared(conn);
    let engine = RedistributionEngine::new(Arc::new(InvoiceRepository::new(conn.clone())));
    (conn, engine)
}

fn with_conn<T>(conn: &Arc<Mutex<Connection>>, f: impl FnOnce(&Connection) -> T) -> T {
    let guard = conn.lock().unwrap();
    f(&guard)
}

// ==========================================
// 试算
// ==========================================

#[test]
fn test_dry_run_selects_candidates_and_sorts_by_date_desc() {
    let (_conn, engine) = seeded();
    let outcome = engine
        .run(&request("Other Charge Remove", true), &SchemaSettings::default())
        .unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.db, "aisdata1");
    // 0.05 入选，0.049999 与区间外的不入选；负数按绝对值
    assert_eq!(outcome.affected_trno_count, 3);
    assert_eq!(outcome.updated_rows, 0);

    let trnos: Vec<&str> = outcome.changes.iter().map(|c| c.trno.as_str()).collect();
    assert_eq!(trnos, vec!["5002", "5005", "5001"]);

    let first = &outcome.changes[2];
    assert_eq!(first.invdate, "2024-05-10");
    assert_eq!(first.old_othamt1, 5.0);
    assert_eq!(first.new_othamt1, 0.0);
    assert_eq!(first.subtotal_before, 105.0);
    assert_eq!(first.subtotal_after, 100.0);

    let negative = &outcome.changes[1];
    assert_eq!(negative.old_othamt1, -3.0);
    assert_eq!(negative.subtotal_before, 27.0);
    assert_eq!(negative.subtotal_after, 30.0);
}

#[test]
fn test_dry_run_does_not_write() {
    let (conn, engine) = seeded();
    engine
        .run(&request("Other Charge Remove", true), &SchemaSettings::default())
        .unwrap();

    with_conn(&conn, |c| {
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5001"), 5.0);
        assert_eq!(query_f64(c, "SELECT unitprice FROM aisdata1.invline WHERE trno = 5001"), 10.0);
        assert_eq!(
            query_i64(c, "SELECT COUNT(*) FROM aisdata1.glpost WHERE acctno = '3320'"),
            3
        );
    });
}

#[test]
fn test_empty_range_returns_note() {
    let (_conn, engine) = seeded();
    let mut req = request("Other Charge Remove", true);
    req.start_date = "2023-01-01".to_string();
    req.end_date = "2023-01-31".to_string();

    let outcome = engine.run(&req, &SchemaSettings::default()).unwrap();
    assert_eq!(outcome.affected_trno_count, 0);
    assert!(outcome.changes.is_empty());
    assert_eq!(outcome.notes.len(), 1);
}

#[test]
fn test_slash_formatted_invoice_dates_are_selected() {
    let conn = test_helpers::create_erp_connection().unwrap();
    test_helpers::seed_redistribution_scenario(&conn).unwrap();
    test_helpers::insert_invoice(&conn, "aisdata1", 5006, "5/14/2024", 2.0, 12.0).unwrap();
    test_helpers::insert_invoice_line(&conn, "aisdata1", 5006, "Q", 1.0, 10.0, 10.0).unwrap();
    test_helpers::insert_invoice(&conn, "aisdata1", 5007, "7/1/2024", 2.0, 12.0).unwrap();
    test_helpers::insert_invoice_line(&conn, "aisdata1", 5007, "Q", 1.0, 10.0, 10.0).unwrap();
    let conn = test_helpers::shared(conn);
    let engine = RedistributionEngine::new(Arc::new(InvoiceRepository::new(conn.clone())));

    let outcome = engine
        .run(&request("Other Charge Remove", true), &SchemaSettings::default())
        .unwrap();

    // 5/14 落在 5002(05-12) 之前；7/1 超出区间
    let trnos: Vec<&str> = outcome.changes.iter().map(|c| c.trno.as_str()).collect();
    assert_eq!(trnos, vec!["5006", "5002", "5005", "5001"]);
    assert_eq!(outcome.changes[0].invdate, "2024-05-14");
}

// ==========================================
// 提交
// ==========================================

#[test]
fn test_commit_rewrites_lines_header_and_gl() {
    let (conn, engine) = seeded();
    let outcome = engine
        .run(&request("Other Charge Remove", false), &SchemaSettings::default())
        .unwrap();

    assert!(!outcome.dry_run);
    assert_eq!(outcome.affected_trno_count, 3);
    assert_eq!(outcome.updated_rows, 3);

    with_conn(&conn, |c| {
        // 5001: Add = (100/100) * (5/10) = 0.5
        assert_eq!(query_f64(c, "SELECT unitprice FROM aisdata1.invline WHERE trno = 5001"), 10.5);
        assert_eq!(query_f64(c, "SELECT unitamount FROM aisdata1.invline WHERE trno = 5001"), 105.0);
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5001"), 0.0);
        assert_eq!(query_f64(c, "SELECT subtotal FROM aisdata1.invhead WHERE trno = 5001"), 105.0);
        assert_eq!(
            query_f64(c, "SELECT amount FROM aisdata1.glpost WHERE trno = 5001 AND acctno = '3050'"),
            105.0
        );
        assert_eq!(
            query_i64(c, "SELECT COUNT(*) FROM aisdata1.glpost WHERE trno = 5001 AND acctno = '3320'"),
            0
        );
        // 其他科目不动
        assert_eq!(
            query_f64(c, "SELECT amount FROM aisdata1.glpost WHERE trno = 5001 AND acctno = '4000'"),
            100.0
        );

        // 5002: 阈值边界
        assert_eq!(query_f64(c, "SELECT unitprice FROM aisdata1.invline WHERE trno = 5002"), 10.05);

        // 5005: 负费用
        assert_eq!(query_f64(c, "SELECT unitprice FROM aisdata1.invline WHERE trno = 5005"), 9.0);
        assert_eq!(query_f64(c, "SELECT subtotal FROM aisdata1.invhead WHERE trno = 5005"), 27.0);

        // 非候选发票不动
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5003"), 0.049999);
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5004"), 9.0);
        // MD 库不动
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata3.invhead WHERE trno = 7001"), 2.0);
    });
}

#[test]
fn test_commit_is_idempotent_on_second_run() {
    let (_conn, engine) = seeded();
    engine
        .run(&request("Other Charge Remove", false), &SchemaSettings::default())
        .unwrap();

    let second = engine
        .run(&request("Other Charge Remove", true), &SchemaSettings::default())
        .unwrap();
    assert_eq!(second.affected_trno_count, 0);
}

#[test]
fn test_failed_invoice_rolls_back_alone() {
    let (conn, engine) = seeded();
    // 5001 最后提交（日期最早）；让它的 3320 删除失败
    with_conn(&conn, |c| {
        c.execute_batch(
            r#"
            CREATE TRIGGER aisdata1.block_5001 BEFORE DELETE ON glpost
            WHEN old.trno = 5001
            BEGIN
                SELECT RAISE(ABORT, 'locked');
            END;
            "#,
        )
        .unwrap();
    });

    let err = engine
        .run(&request("Other Charge Remove", false), &SchemaSettings::default())
        .unwrap_err();
    match err {
        RedistributionError::Repository(RepositoryError::DatabaseTransactionError(msg)) => {
            assert!(msg.contains("5001"));
        }
        other => panic!("意外错误: {:?}", other),
    }

    with_conn(&conn, |c| {
        // 先提交的发票保持已提交
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5002"), 0.0);
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5005"), 0.0);
        // 失败的发票整体回滚
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5001"), 5.0);
        assert_eq!(query_f64(c, "SELECT unitprice FROM aisdata1.invline WHERE trno = 5001"), 10.0);
        assert_eq!(
            query_f64(c, "SELECT amount FROM aisdata1.glpost WHERE trno = 5001 AND acctno = '3050'"),
            105.0
        );
    });
}

// ==========================================
// 库选择 / 校验
// ==========================================

#[test]
fn test_md_action_uses_md_schema() {
    let (conn, engine) = seeded();
    let outcome = engine
        .run(&request("Other Charge Remove (MD)", false), &SchemaSettings::default())
        .unwrap();

    assert_eq!(outcome.db, "aisdata3");
    assert_eq!(outcome.affected_trno_count, 1);
    assert_eq!(outcome.changes[0].trno, "7001");

    with_conn(&conn, |c| {
        assert_eq!(query_f64(c, "SELECT unitprice FROM aisdata3.invline WHERE trno = 7001"), 6.0);
        assert_eq!(query_f64(c, "SELECT othamt1 FROM aisdata1.invhead WHERE trno = 5001"), 5.0);
    });
}

#[test]
fn test_validation_errors_do_not_touch_database() {
    let (_conn, engine) = seeded();

    let err = engine
        .run(&request("Delete Everything", false), &SchemaSettings::default())
        .unwrap_err();
    assert!(matches!(err, RedistributionError::UnsupportedAction(_)));
    assert!(err.is_validation());

    let mut req = request("Other Charge Remove", false);
    req.end_date = "".to_string();
    let err = engine.run(&req, &SchemaSettings::default()).unwrap_err();
    assert!(matches!(err, RedistributionError::MissingDate { .. }));

    let mut req = request("Other Charge Remove", false);
    req.start_date = "2024/99/99".to_string();
    let err = engine.run(&req, &SchemaSettings::default()).unwrap_err();
    assert!(matches!(err, RedistributionError::InvalidDate { .. }));
}

#[test]
fn test_custom_schema_names_are_honored() {
    let (_conn, engine) = seeded();
    let schemas = SchemaSettings {
        invoice: "aisdata3".to_string(),
        ..SchemaSettings::default()
    };
    let outcome = engine
        .run(&request("Other Charge Remove", true), &schemas)
        .unwrap();
    assert_eq!(outcome.db, "aisdata3");
    assert_eq!(outcome.affected_trno_count, 1);
}

// ==========================================
// 分批取数与截断
// ==========================================

#[test]
fn test_large_batch_is_chunked_and_changes_are_capped() {
    let conn = test_helpers::create_erp_connection().unwrap();
    let invoice_count = LINE_FETCH_CHUNK + 100;
    {
        let tx = conn.unchecked_transaction().unwrap();
        for i in 0..invoice_count as i64 {
            let trno = 10_000 + i;
            test_helpers::insert_invoice(&tx, "aisdata1", trno, "2024-05-20", 1.0, 11.0).unwrap();
            test_helpers::insert_invoice_line(&tx, "aisdata1", trno, "Q", 1.0, 10.0, 10.0).unwrap();
        }
        tx.commit().unwrap();
    }
    let conn = test_helpers::shared(conn);
    let engine = RedistributionEngine::new(Arc::new(InvoiceRepository::new(conn.clone())));

    let outcome = engine
        .run(&request("Other Charge Remove", true), &SchemaSettings::default())
        .unwrap();

    assert_eq!(outcome.affected_trno_count, invoice_count);
    assert_eq!(outcome.changes.len(), MAX_CHANGES);
    // 同一日期按发票号降序
    assert_eq!(outcome.changes[0].trno, (10_000 + invoice_count as i64 - 1).to_string());
    assert!(outcome.notes.iter().any(|n| n.contains(&MAX_CHANGES.to_string())));
}
